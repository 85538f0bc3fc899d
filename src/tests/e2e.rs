use std::time::Duration;

use super::fixtures;
use crate::{Configuration, Fmp4Stream};

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

#[tokio::test]
async fn full_stream_with_hls_enabled_respects_fifo_capacity() {
    let config = Configuration::new(Some("t".into()), 2, false, 2);
    let (stream, tx) = Fmp4Stream::spawn(config);

    tx.send(fixtures::stream_with_segments(5, 64, 128))
        .await
        .unwrap();

    wait_until(|| stream.sequence() == 4).await;

    assert_eq!(
        stream.mime().as_deref(),
        Some("video/mp4; codecs='avc1.42C01E'")
    );
    assert!(stream.initialization().is_some());

    // capacity 2: only sequences 3 and 4 remain resident.
    assert!(stream.get_hls_segment(4).is_some());
    assert!(stream.get_hls_segment(3).is_some());
    assert!(stream.get_hls_segment(0).is_none());

    let m3u8 = stream.m3u8().expect("playlist rendered after first segment");
    assert!(m3u8.contains("#EXT-X-MEDIA-SEQUENCE:3"));
    assert!(m3u8.contains("t3"));
    assert!(m3u8.contains("t4"));
    assert!(!m3u8.contains("t0\n"));

    stream.stop().await.unwrap();
}

#[tokio::test]
async fn corruption_is_recovered_and_sequence_continues() {
    let config = Configuration::new(Some("t".into()), 4, false, 4);
    let (stream, tx) = Fmp4Stream::spawn(config);

    let mut init_and_first = fixtures::ftyp_box();
    init_and_first.extend_from_slice(&fixtures::moov_box([0x42, 0xC0, 0x1E], false));
    init_and_first.extend_from_slice(&fixtures::moof_box(64));
    init_and_first.extend_from_slice(&fixtures::mdat_box(128));
    tx.send(init_and_first.into()).await.unwrap();
    wait_until(|| stream.sequence() == 0).await;

    // Noise with no box headers at all, shorter than the default hunt limit.
    tx.send(vec![0xAAu8; 500].into()).await.unwrap();

    let mut recovery = fixtures::moof_box(64);
    recovery.extend_from_slice(&fixtures::mdat_box(128));
    tx.send(recovery.into()).await.unwrap();

    wait_until(|| stream.sequence() == 1).await;
    stream.stop().await.unwrap();
}

#[tokio::test]
async fn mfra_end_marker_produces_no_segment_or_error() {
    let (stream, tx) = Fmp4Stream::spawn(Configuration::default());

    let mut stream_bytes = fixtures::ftyp_box();
    stream_bytes.extend_from_slice(&fixtures::moov_box([0x42, 0xC0, 0x1E], false));
    stream_bytes.extend_from_slice(&fixtures::moof_box(64));
    stream_bytes.extend_from_slice(&fixtures::mdat_box(128));
    tx.send(stream_bytes.into()).await.unwrap();
    wait_until(|| stream.segment().is_some()).await;

    tx.send(fixtures::mfra_box(16).into()).await.unwrap();
    // Give the driver a chance to process the mfra chunk; no new segment or
    // panic should result.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stream.sequence(), 0);

    stream.stop().await.unwrap();
}

#[tokio::test]
async fn subscriber_sees_segments_in_order_across_the_whole_stream() {
    let (stream, tx) = Fmp4Stream::spawn(Configuration::default());
    let sub = stream.subscribe();

    tx.send(fixtures::stream_with_segments(3, 32, 32))
        .await
        .unwrap();

    for _ in 0..3 {
        let segment = sub.recv().await.expect("segment published");
        assert_eq!(segment.len(), 64);
    }

    stream.stop().await.unwrap();
}

#[tokio::test]
async fn stop_closes_the_input_channel_so_further_sends_fail() {
    let (stream, tx) = Fmp4Stream::spawn(Configuration::default());
    stream.stop().await.unwrap();
    assert!(tx.send(fixtures::ftyp_box().into()).await.is_err());
}
