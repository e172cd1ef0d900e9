use plop_chunks::{Chunker, ChunkerConfig, Pol, Tables};

const TEST_POL: u64 = 0x3DA3358B4DC173;

fn make_data(size: usize) -> Vec<u8> {
    // Semi-realistic data: repeating pattern with some entropy
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3) ^ (i >> 11)) as u8)
        .collect()
}

#[divan::bench(args = [65536, 1048576, 8388608])]
fn rabin_chunk(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    let tables = Tables::new(Pol::from_raw(TEST_POL));
    let config = ChunkerConfig {
        min_size: 4096,
        max_size: 65536,
        avg_bits: 13,
    };
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            rt.block_on(async {
                let mut chunker =
                    Chunker::new(divan::black_box(&data[..]), tables.clone(), config);
                let mut n = 0usize;
                while let Some(chunk) = chunker.next_chunk().await.unwrap() {
                    n += chunk.len();
                }
                n
            })
        });
}

#[divan::bench]
fn table_construction(bencher: divan::Bencher) {
    bencher.bench(|| Tables::new(divan::black_box(Pol::from_raw(TEST_POL))));
}

fn main() {
    divan::main();
}
