/// Modbus CRC16 (polynomial 0xA001, initial value 0xFFFF, LSB first).
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    let poly: u16 = 0xA001;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// CRC16 split in wire order: `[low, high]`.
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16_modbus(data).to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty_input() {
        assert_eq!(crc16_modbus(&[]), 0xFFFF);
        assert_eq!(crc16_bytes(&[]), [0xFF, 0xFF]);
    }

    #[test]
    fn test_crc16_reference_vectors() {
        // read holding register 2 on slave 1
        assert_eq!(crc16_bytes(&[0x01, 0x03, 0x00, 0x02, 0x00, 0x01]), [0x25, 0xCA]);
        // read all input registers on the general address
        assert_eq!(crc16_bytes(&[0xF8, 0x04, 0x00, 0x00, 0x00, 0x0A]), [0x64, 0x64]);
        assert_eq!(crc16_modbus(&[0xF8, 0x42]), 0x41C2);
    }

    #[test]
    fn test_crc16_of_frame_with_crc_is_zero() {
        let mut frame = vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x0A];
        frame.extend_from_slice(&crc16_bytes(&frame));
        assert_eq!(crc16_modbus(&frame), 0x0000);
    }
}
