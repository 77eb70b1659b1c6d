use hb::cli;

fn main() {
    let exit_code = match cli::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("hb: error: {err:#}");
            1
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
