fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let input = if args.len() > 1 {
        std::fs::read_to_string(&args[1]).expect("Failed to read file")
    } else {
        "# Overview\n\nSee the [docs](https://example.com) for *details*.".to_string()
    };

    // Load config from current directory
    let config = polymark::Config::load(std::path::Path::new("config.toml"));
    for format in polymark::Format::ALL {
        println!("===== {format} =====");
        print!("{}", polymark::convert_with_config(format, &input, &config));
    }
}
