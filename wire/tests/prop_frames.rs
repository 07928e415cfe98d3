use proptest::prelude::*;
use wire::{
    decode_frame, encode_call, encode_string_update, CallHeader, DecodeError, Frame, Limits,
    StringUpdateHeader,
};

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        match decode_frame(&bytes, &Limits::for_testing()) {
            Ok(frame) => prop_assert_eq!(frame.kind() as u8, bytes[0]),
            Err(DecodeError::EmptyFrame) => prop_assert!(bytes.is_empty()),
            Err(_) => {}
        }
    }

    #[test]
    fn string_updates_survive_framing(id in any::<u16>(), text in "\\PC{0,40}") {
        let limits = Limits::for_testing();
        let mut buf = vec![0u8; wire::string_update_len(&text)];
        let header = StringUpdateHeader { id };
        let written = encode_string_update(&header, &text, &limits, &mut buf).unwrap();
        prop_assert_eq!(written, buf.len());
        let frame = decode_frame(&buf, &limits).unwrap();
        prop_assert_eq!(frame, Frame::StringUpdate { header, text: &text });
    }

    #[test]
    fn call_payload_is_passed_through(
        id in any::<u16>(),
        payload in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let limits = Limits::for_testing();
        let mut buf = vec![0u8; payload.len() + wire::CALL_HEADER_SIZE];
        let header = CallHeader { message_type_id: id };
        encode_call(&header, &payload, &limits, &mut buf).unwrap();
        match decode_frame(&buf, &limits).unwrap() {
            Frame::Call { header: decoded, payload: body } => {
                prop_assert_eq!(decoded, header);
                prop_assert_eq!(body, payload.as_slice());
            }
            other => prop_assert!(false, "unexpected frame {:?}", other),
        }
    }
}
