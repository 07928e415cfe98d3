use bitstream::{BitError, BitReader, BitWriter};

#[test]
fn bounded_writer_roundtrip_bits() {
    let mut buf = [0u8; 8];
    let mut writer = BitWriter::over(&mut buf);
    writer.write_bits(0b1010, 4).unwrap();
    writer.write_bits(0xAB, 8).unwrap();
    let bits = writer.bits_written();
    let bytes_used = writer.bytes_written();

    let mut reader = BitReader::with_bit_len(&buf[..bytes_used], bits);
    assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
    assert!(reader.is_empty());
}

#[test]
fn bounded_writer_rejects_block_past_capacity() {
    let mut buf = [0u8; 4];
    let mut writer = BitWriter::over(&mut buf);
    writer.write_block(&[1, 2, 3]).unwrap();
    assert!(matches!(
        writer.write_block(&[4, 5]),
        Err(BitError::BufferOverflow {
            attempted: 40,
            capacity: 32
        })
    ));
    assert_eq!(writer.finish(), vec![1, 2, 3]);
}

#[test]
fn growable_writer_roundtrip_mixed() {
    let mut writer = BitWriter::new();
    writer.write_bit(true).unwrap();
    writer.write_bits(0b1010, 4).unwrap();
    writer.align_to_byte().unwrap();
    writer.write_block(&0xBEEFu16.to_le_bytes()).unwrap();
    writer.write_adaptive_number(300).unwrap();
    let mut out = vec![0x42];
    writer.finish_into(&mut out);

    let mut reader = BitReader::new(&out[1..]);
    assert!(reader.read_bit().unwrap());
    assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    reader.align_to_byte().unwrap();
    let mut raw = [0u8; 2];
    reader.read_block(&mut raw).unwrap();
    assert_eq!(u16::from_le_bytes(raw), 0xBEEF);
    assert_eq!(reader.read_adaptive_number().unwrap(), 300);
}
