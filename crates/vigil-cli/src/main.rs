#[tokio::main]
async fn main() {
    let matches = vigil_cli::build_cli().get_matches();
    let code = match vigil_cli::run(matches).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}
