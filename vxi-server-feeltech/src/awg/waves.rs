//! Waveform code translation between the Siglent and FY vocabularies.
//!
//! The Bode plot only ever uses a sine wave, so the default translation
//! pins every request to the FY sine code. The full table below covers the
//! remaining Siglent waveforms for which an FY-series equivalent exists and
//! is enabled with `--full-wave-translation`.

/// The FY-series sine wave code.
pub const FY_SINE: u32 = 0;

/// FY wave codes indexed by Siglent wave code; -1 marks waveforms with no
/// FY equivalent.
const SIGLENT_TO_FY: [i8; 48] = [
    0,  // Sine
    27, // Noise
    11, // StairUp
    12, // StairDn
    10, // Stairud
    5,  // Ppulse
    -1, // Npulse
    3,  // Trapezia
    8,  // Upramp
    9,  // Dnramp
    14, // Exp_fall
    13, // Exp_rise
    18, // Logfall
    17, // Logrise
    -1, // Sqrt
    -1, // Root3
    -1, // X^2
    -1, // X^3
    30, // Sinc
    -1, // Gaussian
    -1, // Dlorentz
    -1, // Haversine
    25, // Lorentz
    -1, // Gauspuls
    -1, // Gmonopuls
    -1, // Tripuls
    28, // Cardiac
    -1, // Quake
    35, // Chirp
    26, // Twotone
    -1, // Snr
    -1, // Hamming
    -1, // Hanning
    -1, // Kaiser
    -1, // Blackman
    -1, // Gausswin
    7,  // Triang
    -1, // Harris
    -1, // Bartlett
    -1, // Tan
    -1, // Cot
    -1, // Sec
    -1, // Csc
    -1, // Asin
    -1, // Acos
    -1, // Atan
    -1, // Acot
    2,  // Square
];

/// Translate a Siglent wave code to the matching FY wave code, falling back
/// to sine for unknown codes and waveforms without an equivalent.
pub fn fy_wave(siglent_code: u32) -> u32 {
    SIGLENT_TO_FY
        .get(siglent_code as usize)
        .copied()
        .filter(|code| *code >= 0)
        .map(|code| code as u32)
        .unwrap_or(FY_SINE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sine_maps_to_sine() {
        assert_eq!(fy_wave(0), FY_SINE);
    }

    #[test]
    fn square_maps_to_rectangle() {
        assert_eq!(fy_wave(47), 2);
    }

    #[test]
    fn unmatched_waveforms_fall_back_to_sine() {
        assert_eq!(fy_wave(14), FY_SINE); // Sqrt has no FY equivalent
        assert_eq!(fy_wave(1000), FY_SINE);
    }
}
