pub mod arbitration;
pub mod band_splitter;
pub mod compressor_band;
pub mod constants;
pub mod parameters;
pub mod processor;
pub mod sample_relay;
pub mod spectral_transform;
pub mod window_functions;
