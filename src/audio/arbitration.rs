use crate::audio::parameters::BandParameters;

/// Decides which bands end up in the output sum.
///
/// Solo wins over everything: as soon as one band is soloed only soloed bands are heard, even if
/// they are also muted. Without any solo, muted bands drop out. Bypass never affects mixing, a
/// bypassed band is still summed, just uncompressed.
pub fn active_bands(bands: &[BandParameters; 3]) -> [bool; 3] {
    let any_soloed = bands.iter().any(|band| band.soloed);

    bands.map(|band| {
        if any_soloed {
            band.soloed
        } else {
            !band.muted
        }
    })
}
