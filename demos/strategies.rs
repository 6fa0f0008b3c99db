//! Runs the same fragmented workload under each placement strategy and shows
//! which hole every one of them picks.
//!
//! `RUST_LOG=fitalloc=trace cargo run --example strategies` to watch the heap
//! split and merge blocks.

use fitalloc::{Config, Heap, Strategy};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    for strategy in Strategy::ALL {
        let mut heap = Heap::new(Config::new(strategy).with_increment(4096))?;

        // Three holes of different sizes, kept apart by small live blocks.
        let mut holes = Vec::new();
        let mut separators = Vec::new();

        for size in [40, 100, 10] {
            holes.push(heap.acquire(size)?);
            separators.push(heap.acquire(8)?);
        }

        let addrs: Vec<_> = holes.iter().map(|hole| hole.as_ptr()).collect();

        for hole in holes.into_iter().rev() {
            heap.release(hole)?;
        }

        println!("[{strategy}] before: {}", heap.report());

        let picked = heap.acquire(10)?;
        let hole = addrs.iter().position(|addr| *addr == picked.as_ptr());

        match hole {
            Some(index) => println!("[{strategy}] 10 bytes went to hole #{index} at {:?}", picked.as_ptr()),
            None => println!("[{strategy}] 10 bytes went to the arena tail at {:?}", picked.as_ptr()),
        }

        println!("[{strategy}] after:  {}\n", heap.report());

        heap.release(picked)?;
        for separator in separators {
            heap.release(separator)?;
        }

        println!("[{strategy}] all released: {}\n", heap.report());
    }

    Ok(())
}
