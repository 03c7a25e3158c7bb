//! Coco CLI
//!
//! Reads textual IR, runs the bounds-check transform, writes textual IR.

use cococ::commands::{
    instrument_file, parse_options, print_file, rewrite_file, verify_file, CommandError,
};

fn main() {
    cococ::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];
    let result = match command.as_str() {
        "instrument" | "rewrite" | "verify" | "print" => {
            parse_options(&args[2..]).and_then(|(input, options)| match command.as_str() {
                "instrument" => instrument_file(&input, &options),
                "rewrite" => rewrite_file(&input, &options),
                "verify" => verify_file(&input),
                _ => print_file(&input, &options),
            })
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" | "-v" => {
            println!("coco {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        if matches!(err, CommandError::Usage(_)) {
            eprintln!("Usage: coco {command} <file.cir> [-o <out>] [--no-rewrite] [--entry=<name>] [--check-fn=<name>]");
        }
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Coco bounds checker");
    println!();
    println!("Usage: coco <command> <file.cir> [options]");
    println!();
    println!("Commands:");
    println!("  instrument <file.cir>  Propagate array sizes and insert bounds checks");
    println!("  rewrite <file.cir>     Propagate array sizes only (no checks)");
    println!("  verify <file.cir>      Parse and structurally verify");
    println!("  print <file.cir>       Parse and pretty-print");
    println!("  help                   Show this help message");
    println!("  version                Show version information");
    println!();
    println!("Options:");
    println!("  -o <path>              Write output to <path> instead of stdout");
    println!("  --no-rewrite           instrument: input is `rewrite` output; only insert checks");
    println!("  --entry=<name>         Entry function (default: main)");
    println!("  --check-fn=<name>      Runtime check primitive (default: __coco_check_bounds)");
    println!();
    println!("Set RUST_LOG=coco_bounds=debug to trace the transform.");
}
