fn main() {
    pan2players_lib::init_logging();

    if let Err(e) = pan2players_lib::run() {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
