use std::env;

const DEFAULT_PORT: u16 = 8080;

fn parse_port(raw: Option<&str>) -> Result<u16, String> {
    match raw {
        None => Ok(DEFAULT_PORT),
        Some(s) => s
            .parse::<u16>()
            .map_err(|_| format!("Invalid port {s:?}; expected an integer in 0-65535")),
    }
}

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = match parse_port(raw_args.get(2).map(|s| s.as_str())) {
            Ok(port) => port,
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Usage: cargo run -- serve [port]");
                std::process::exit(1);
            }
        };
        if let Err(e) = solvency::api::run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    eprintln!("Usage: cargo run -- serve [port]");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_falls_back_to_the_default() {
        assert_eq!(parse_port(None), Ok(DEFAULT_PORT));
    }

    #[test]
    fn numeric_port_is_accepted() {
        assert_eq!(parse_port(Some("3000")), Ok(3000));
    }

    #[test]
    fn non_numeric_port_is_rejected_with_the_offending_value() {
        let err = parse_port(Some("eighty")).expect_err("must reject");
        assert!(err.contains("eighty"));

        assert!(parse_port(Some("70000")).is_err());
    }
}
