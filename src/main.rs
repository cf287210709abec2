#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")] // console only in debug builds

fn main() {
    std::process::exit(client_host_embedder::run(std::env::args_os()));
}
