use lzo_frame::{MessageType, frame_message};
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::process::ExitCode;

const DEFAULT_ADDR: &str = "127.0.0.1:7300";

const USAGE: &str = "Usage: frame-send [--addr HOST:PORT] [--type 0-127] [--compress] [FILE]

Reads the payload from FILE, or stdin when FILE is omitted or '-',
and sends it to the ingest service as a single frame.";

#[derive(Debug, PartialEq)]
struct Options {
    addr: String,
    r#type: MessageType,
    compress: bool,
    file: Option<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options, String> {
    let mut options = Options {
        addr: DEFAULT_ADDR.to_owned(),
        r#type: MessageType::default(),
        compress: false,
        file: None,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--addr" => options.addr = args.next().ok_or("--addr requires a value")?,
            "--type" => {
                let raw = args.next().ok_or("--type requires a value")?;
                options.r#type = raw
                    .parse::<u8>()
                    .ok()
                    .and_then(MessageType::new)
                    .ok_or_else(|| format!("invalid message type '{raw}', expected 0-127"))?;
            }
            "--compress" | "-c" => options.compress = true,
            "-" => options.file = None,
            flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
            path => options.file = Some(path.to_owned()),
        }
    }

    Ok(options)
}

fn read_payload(file: Option<&str>) -> io::Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path),
        None => {
            let mut payload = Vec::new();
            io::stdin().read_to_end(&mut payload)?;
            Ok(payload)
        }
    }
}

fn run(options: &Options) -> Result<(), String> {
    let payload = read_payload(options.file.as_deref()).map_err(|e| format!("read failed: {e}"))?;
    let frame = frame_message(&payload, options.r#type, options.compress)
        .map_err(|e| format!("cannot frame payload: {e}"))?;

    let mut stream =
        TcpStream::connect(&options.addr).map_err(|e| format!("connect {}: {e}", options.addr))?;
    stream.write_all(&frame).map_err(|e| format!("send failed: {e}"))?;

    println!(
        "Sent {} payload bytes as a {}-byte frame (type {}, compressed: {}) to {}",
        payload.len(),
        frame.len(),
        options.r#type,
        options.compress,
        options.addr
    );
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let result = parse_args(args).and_then(|options| run(&options));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}\n\n{USAGE}");
            ExitCode::FAILURE
        }
    }
}
