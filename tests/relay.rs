use multiband_comp::audio::sample_relay::{self, SampleTap};
use std::thread;

#[test]
fn overflow_keeps_the_most_recent_chunks() {
    let capacity = 16;
    let (mut producer, mut consumer) = sample_relay::channel(32, capacity).unwrap();

    // Pushed in odd sizes so chunk boundaries don't line up with the calls
    let total_chunks = 50;
    let samples: Vec<f32> = (0..total_chunks * 32).map(|i| (i / 32) as f32).collect();
    for piece in samples.chunks(21) {
        producer.push(piece);
    }

    assert_eq!(consumer.available_chunks(), capacity);
    assert_eq!(consumer.dropped_chunks(), total_chunks - capacity);

    let mut expected = (total_chunks - capacity) as f32;
    while let Some(chunk) = consumer.pop() {
        assert!(chunk.iter().all(|&s| s == expected));
        expected += 1.0;
    }
    assert_eq!(expected, total_chunks as f32);
    assert!(consumer.pop().is_none());
}

#[test]
fn concurrent_consumer_never_sees_torn_or_reordered_chunks() {
    const CHUNKS: usize = 20_000;
    const CHUNK_SIZE: usize = 64;
    let (mut producer, mut consumer) = sample_relay::channel(CHUNK_SIZE, 4).unwrap();

    let audio_thread = thread::spawn(move || {
        for i in 0..CHUNKS {
            producer.push(&[i as f32; CHUNK_SIZE]);
        }
    });

    let mut last = -1.0f32;
    let mut received = 0;
    loop {
        // Checked before draining, so everything pushed before the check gets drained below
        let finished = audio_thread.is_finished();
        while let Some(chunk) = consumer.pop() {
            let id = chunk[0];
            assert!(chunk.iter().all(|&s| s == id), "torn chunk {id}");
            assert!(id > last, "chunk {id} arrived after {last}");
            last = id;
            received += 1;
        }

        if finished {
            break;
        }
        thread::yield_now();
    }
    audio_thread.join().unwrap();

    assert!(received > 0);
    assert_eq!(received + consumer.dropped_chunks(), CHUNKS);
}

#[test]
fn stereo_tap_keeps_channels_apart() {
    let (mut tap, mut relays) = SampleTap::new(2, 4, 8).unwrap();
    for _ in 0..3 {
        tap.push(0, &[0.5; 4]);
        tap.push(1, &[-0.5; 4]);
    }

    assert_eq!(relays[0].available_chunks(), 3);
    assert_eq!(relays[1].available_chunks(), 3);
    assert!(relays[1].pop().unwrap().iter().all(|&s| s == -0.5));
}
