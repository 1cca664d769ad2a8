use fluxprobe_core::TrackingAllocator;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn main() {
    if let Err(e) = fluxprobe_cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
