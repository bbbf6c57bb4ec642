use crate::SensorError;

/// Number of 16 bit words read from the PROM.
pub const PROM_WORDS: usize = 7;

/// The factory calibration data as fetched from the PROM.
///
/// Word 0 holds the CRC-4 and factory data, words 1 to 6 are the
/// compensation coefficients C1..C6.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationTable {
    words: [u16; PROM_WORDS],
}

impl CalibrationTable {
    pub const fn new(words: [u16; PROM_WORDS]) -> Self {
        Self { words }
    }

    /// All PROM words, `C[0]` first.
    pub fn words(&self) -> &[u16; PROM_WORDS] {
        &self.words
    }

    /// The CRC/factory word `C[0]`.
    pub fn crc_word(&self) -> u16 {
        self.words[0]
    }

    /// Pressure sensitivity, SENS_T1 (C1).
    pub fn pressure_sensitivity(&self) -> u16 {
        self.words[1]
    }

    /// Pressure offset, OFF_T1 (C2).
    pub fn pressure_offset(&self) -> u16 {
        self.words[2]
    }

    /// Temperature coefficient of pressure sensitivity, TCS (C3).
    pub fn temperature_coefficient_of_pressure_sensitivity(&self) -> u16 {
        self.words[3]
    }

    /// Temperature coefficient of pressure offset, TCO (C4).
    pub fn temperature_coefficient_of_pressure_offset(&self) -> u16 {
        self.words[4]
    }

    /// Reference temperature, T_REF (C5).
    pub fn reference_temperature(&self) -> u16 {
        self.words[5]
    }

    /// Temperature coefficient of the temperature, TEMPSENS (C6).
    pub fn temperature_coefficient_of_temperature(&self) -> u16 {
        self.words[6]
    }

    /// Checks the PROM contents against the CRC-4 stored in the top nibble of
    /// `C[0]`.
    ///
    /// Initialisation never calls this; a table that fails the check is still
    /// usable.
    pub fn verify_checksum<E>(&self) -> Result<(), SensorError<E>> {
        let expected = ((0xF000 & self.words[0]) >> 12) as u8;
        let mut prom = self.words;
        prom[0] &= 0x0FFF;
        let got = crc4(&prom);
        if expected != got {
            return Err(SensorError::PromCrcMismatch { got, expected });
        }
        Ok(())
    }
}

impl From<[u16; PROM_WORDS]> for CalibrationTable {
    fn from(words: [u16; PROM_WORDS]) -> Self {
        Self::new(words)
    }
}

/// Generates a 4bit cyclic redundancy check as described in the datasheet.
///
/// The caller clears the CRC nibble of the first word. The datasheet's
/// trailing padding word is appended here. The crc is stored in the 4 LSBs of
/// the result.
fn crc4(buffer: &[u16]) -> u8 {
    let mut n_remainder: u16 = 0;
    for byte in buffer
        .iter()
        .chain([0u16].iter())
        .flat_map(|word| word.to_be_bytes())
    {
        n_remainder ^= byte as u16;
        for _ in 0..8 {
            if n_remainder & 0x8000 != 0 {
                n_remainder = (n_remainder << 1) ^ 0x3000;
            } else {
                n_remainder <<= 1;
            }
        }
    }
    ((n_remainder >> 12) & 0x000F) as u8
}
