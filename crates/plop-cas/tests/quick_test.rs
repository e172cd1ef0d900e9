//! Randomized comparison tests: reading through the store must behave
//! exactly like slicing the original bytes, for any input and any
//! offset/length combination, without ever panicking.

use std::sync::OnceLock;

use proptest::prelude::*;

use plop_cas::{Bucket, Store};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(2654435761) ^ (i >> 7)) as u8)
        .collect()
}

/// One shared store for the property tests; the KDF is deliberately
/// expensive and the bucket is content-addressed, so reuse is free.
fn fuzz_store() -> &'static Store {
    static STORE: OnceLock<Store> = OnceLock::new();
    STORE.get_or_init(|| {
        Store::builder("s3kr1t")
            .chunk_limits(256, 1024)
            .chunk_goal(512)
            .bucket(Bucket::memory().expect("memory bucket"))
            .build()
            .expect("store construction")
    })
}

#[tokio::test]
async fn random_access_matches_reference() {
    let size: usize = 1 << 20;
    let data = make_data(size);
    let store = Store::builder("s3kr1t")
        // cause extent crossings to happen
        .chunk_limits((size / 100) as u32, (size / 10) as u32)
        .chunk_goal((size / 50) as u32)
        .bucket(Bucket::memory().expect("memory bucket"))
        .build()
        .expect("store construction");

    let key = store.create(&data[..]).await.expect("create");
    let handle = store.open(&key).await.expect("open");
    assert_eq!(handle.size(), size as u64);

    // Deterministic pseudo-random probes, including zero-length reads
    // and offsets past EOF.
    let mut state = 0x243F6A8885A308D3u64;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };
    for _ in 0..200 {
        let offset = next() % (size + 1000);
        let len = next() % 5000;
        let mut buf = vec![0u8; len];
        let n = handle
            .read_at(&mut buf, offset as u64)
            .await
            .unwrap_or_else(|e| panic!("read_at offset={offset} len={len}: {e}"));
        let expected: &[u8] = if offset >= size {
            &[]
        } else {
            &data[offset..size.min(offset + len)]
        };
        assert_eq!(n, expected.len(), "count at offset={offset} len={len}");
        assert_eq!(&buf[..n], expected, "content at offset={offset} len={len}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = fuzz_store();
            let key = store.create(&data[..]).await.unwrap();
            let handle = store.open(&key).await.unwrap();
            prop_assert_eq!(handle.size(), data.len() as u64);
            let content = handle.reader().read_to_end().await.unwrap();
            prop_assert_eq!(&content, &data);
            Ok(())
        })?;
    }

    #[test]
    fn recreate_returns_same_key(data in proptest::collection::vec(any::<u8>(), 0..=2048)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = fuzz_store();
            let a = store.create(&data[..]).await.unwrap();
            let b = store.create(&data[..]).await.unwrap();
            prop_assert_eq!(a, b);
            Ok(())
        })?;
    }
}
