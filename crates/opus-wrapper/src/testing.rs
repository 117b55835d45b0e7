pub const SAMPLE_RATE: i32 = 48000;
pub const NUM_CHANNELS: i32 = 2;
pub const FRAME_SIZE: usize = 960;

pub const SOME_VALID_LOSSES: [i32; 7] = [0, 1, 2, 5, 10, 20, 50];
pub const INVALID_SAMPLE_RATES: [i32; 4] = [-1, 44100, 96000, 192000];
pub const INVALID_CHANNEL_COUNTS: [i32; 4] = [-2, 0, 3, 4];

/// `FRAME_SIZE * NUM_CHANNELS` samples of deterministic noise.
pub fn dummy_audio() -> Vec<i16> {
    let mut seed: u32 = 0;
    (0..FRAME_SIZE * NUM_CHANNELS as usize)
        .map(|_| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 16) as i16
        })
        .collect()
}
