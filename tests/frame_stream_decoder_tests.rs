use microrpc::frame::{FrameCodec, FrameDecodeError, FrameStreamDecoder, Request};
use rand::Rng;

fn sample_frames() -> Vec<Vec<u8>> {
    (0..5u32)
        .map(|i| {
            let mut request = Request::new(
                i,
                1,
                "UserService",
                "GetByID",
                format!(r#"{{"id":{i}}}"#).into_bytes(),
            );
            request.meta.insert("seq".into(), i.to_string());
            FrameCodec::encode_request(&request).unwrap()
        })
        .collect()
}

#[test]
fn decoder_handles_incomplete_input() {
    let frame = sample_frames().remove(0);
    let (head, tail) = frame.split_at(frame.len() / 2);

    let mut decoder = FrameStreamDecoder::new();

    assert_eq!(decoder.read_bytes(head).count(), 0);
    assert_eq!(decoder.pending_len(), head.len());

    let frames: Vec<_> = decoder.read_bytes(tail).collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].as_ref().unwrap(), &frame);
    assert_eq!(decoder.pending_len(), 0);
}

#[test]
fn decoder_splits_coalesced_frames() {
    let frames = sample_frames();
    let joined: Vec<u8> = frames.concat();

    let mut decoder = FrameStreamDecoder::new();
    let decoded: Vec<Vec<u8>> = decoder.read_bytes(&joined).map(|r| r.unwrap()).collect();

    assert_eq!(decoded, frames);
}

#[test]
fn decoder_recovers_frames_from_random_chunking() {
    let frames = sample_frames();
    let joined: Vec<u8> = frames.concat();
    let mut rng = rand::rng();

    for _ in 0..50 {
        let mut decoder = FrameStreamDecoder::new();
        let mut decoded = Vec::new();
        let mut offset = 0;

        while offset < joined.len() {
            let step = rng.random_range(1..=17).min(joined.len() - offset);
            for frame in decoder.read_bytes(&joined[offset..offset + step]) {
                decoded.push(frame.unwrap());
            }
            offset += step;
        }

        assert_eq!(decoded, frames);
        for (i, raw) in decoded.iter().enumerate() {
            let request = FrameCodec::decode_request(raw).unwrap();
            assert_eq!(request.request_id, i as u32);
        }
    }
}

#[test]
fn oversized_frame_poisons_decoder() {
    let mut prologue = Vec::new();
    prologue.extend_from_slice(&u32::MAX.to_be_bytes());
    prologue.extend_from_slice(&0u32.to_be_bytes());
    prologue.extend_from_slice(&0u32.to_be_bytes());
    prologue.extend_from_slice(&[0, 0, 1]);

    let mut decoder = FrameStreamDecoder::with_max_frame_size(1024);
    let results: Vec<_> = decoder.read_bytes(&prologue).collect();

    assert!(matches!(
        results.as_slice(),
        [Err(FrameDecodeError::FrameTooLarge { limit: 1024, .. })]
    ));
    assert!(decoder.is_poisoned());

    // Nothing further is emitted once the stream is out of sync.
    let frame = sample_frames().remove(0);
    assert_eq!(decoder.read_bytes(&frame).count(), 0);
}
