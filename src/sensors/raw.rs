//! Helpers for assembling raw ADC readings from register bytes

/// Reinterpret an unsigned 16-bit register word as two's complement
///
/// Equivalent to `w` for `w < 32768` and `w - 65536` otherwise.
pub fn reinterpret_i16(word: u16) -> i16 {
    word as i16
}

/// Reinterpret an unsigned byte as two's complement
pub fn reinterpret_i8(byte: u8) -> i8 {
    byte as i8
}

/// Swap an SMBus word read from a chip that sends its MSB first
pub fn swap_word(word: u16) -> u16 {
    word.swap_bytes()
}

/// Big-endian word from the first two bytes of `data`
pub fn be_u16(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[0], data[1]])
}

/// Bosch 20-bit ADC value from `msb`, `lsb`, `xlsb` (upper nibble only)
pub fn bosch_20bit(data: &[u8]) -> i32 {
    (i32::from(data[0]) << 12) | (i32::from(data[1]) << 4) | (i32::from(data[2]) >> 4)
}

/// 24-bit big-endian value from three bytes
pub fn be_u24(data: &[u8]) -> u32 {
    (u32::from(data[0]) << 16) | (u32::from(data[1]) << 8) | u32::from(data[2])
}
