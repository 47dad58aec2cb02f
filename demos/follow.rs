use log_follower::follow;
use std::env;
use std::process;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <file_path> [window]", args[0]);
        process::exit(1);
    }

    let file_path = &args[1];
    let tail = follow(file_path)
        .poll_interval(Duration::from_millis(250))
        .indexed();

    let result = match args.get(2).map(|n| n.parse::<usize>()) {
        Some(Ok(size)) => match tail.window(size).and_then(|t| t.into_stream()) {
            Ok(mut stream) => {
                println!("Following {} (last {} lines)", file_path, size);
                while let Some(window) = stream.next().await {
                    match window {
                        Ok(lines) => {
                            println!("---");
                            for (index, line) in lines {
                                println!("{:>6} {}", index, line);
                            }
                        }
                        Err(e) => {
                            eprintln!("Error following file: {}", e);
                            process::exit(1);
                        }
                    }
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        Some(Err(e)) => {
            eprintln!("Invalid window size: {}", e);
            process::exit(1);
        }
        None => match tail.into_stream() {
            Ok(mut stream) => {
                println!("Following {}", file_path);
                while let Some(line) = stream.next().await {
                    match line {
                        Ok((index, content)) => println!("{:>6} {}", index, content),
                        Err(e) => {
                            eprintln!("Error following file: {}", e);
                            process::exit(1);
                        }
                    }
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error setting up follow: {}", e);
        process::exit(1);
    }
}
