/// Use mimalloc as the global allocator.
/// Chunk splitting allocates one small Vec per line, which is exactly the
/// workload where mimalloc's thread-local caching beats glibc malloc.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod countsort;
