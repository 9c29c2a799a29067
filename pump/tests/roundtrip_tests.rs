//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Round-trip correctness for the stream pump.
//!
//! Whatever is written to the pump's reader side must come out of the output
//! channel byte-for-byte, independent of chunking and of the configured read
//! buffer size.

use bytes::Bytes;
use proptest::prelude::*;
use std::time::Duration;
use teleway_pump::StreamPump;
use tokio::io::{AsyncWriteExt, duplex};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

async fn roundtrip(data: Vec<u8>, read_buf_size: usize) -> Vec<u8> {
    let (_input_tx, input_rx) = mpsc::channel::<Bytes>(8);
    let (output_tx, mut output_rx) = mpsc::channel(64);
    let (mut read_peer, pump_reader) = duplex(8192);
    let (pump_writer, _write_peer) = duplex(8192);

    let cancel = CancellationToken::new();
    let pump = StreamPump::new(input_rx, output_tx, pump_reader, pump_writer)
        .with_read_buf_size(read_buf_size);
    let task = tokio::spawn(pump.run(cancel.clone()));

    let expected_len = data.len();
    read_peer.write_all(&data).await.unwrap();

    let mut collected = Vec::with_capacity(expected_len);
    while collected.len() < expected_len {
        let chunk = timeout(Duration::from_secs(1), output_rx.recv())
            .await
            .expect("timed out collecting pump output")
            .expect("pump output closed early");
        collected.extend_from_slice(&chunk);
    }

    cancel.cancel();
    task.await.unwrap();
    collected
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn output_concatenation_matches_written_bytes(
        data in proptest::collection::vec(any::<u8>(), 1..2048),
        read_buf_size in prop_oneof![
            Just(32usize),
            Just(64usize),
            Just(256usize),
            Just(1024usize),
            Just(4096usize),
        ],
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let collected = runtime.block_on(roundtrip(data.clone(), read_buf_size));
        prop_assert_eq!(collected, data);
    }
}

#[tokio::test]
async fn zero_length_chunks_are_tolerated() {
    let (input_tx, input_rx) = mpsc::channel(8);
    let (output_tx, mut output_rx) = mpsc::channel(8);
    let (mut read_peer, pump_reader) = duplex(256);
    let (pump_writer, mut write_peer) = duplex(256);

    let cancel = CancellationToken::new();
    let pump = StreamPump::new(input_rx, output_tx, pump_reader, pump_writer);
    let task = tokio::spawn(pump.run(cancel.clone()));

    // an empty chunk is forwarded as a zero-length write and must not wedge
    // the input direction
    input_tx.send(Bytes::new()).await.unwrap();
    input_tx.send(Bytes::from_static(b"after")).await.unwrap();

    let mut buf = [0u8; 5];
    timeout(Duration::from_secs(1), async {
        use tokio::io::AsyncReadExt;
        write_peer.read_exact(&mut buf).await
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(&buf, b"after");

    read_peer.write_all(b"ok").await.unwrap();
    let chunk = timeout(Duration::from_secs(1), output_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&chunk[..], b"ok");

    cancel.cancel();
    task.await.unwrap();
}
