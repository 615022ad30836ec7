//! Decode - example of reading an event stream from stdin.
//!
//! This example demonstrates:
//! - Reading back-to-back frames with `FrameReader`
//! - Inspecting the `:event-type` header of each frame
//! - Extracting the last `<answer>` segment from trace frames
//!
//! # Running
//!
//! Pipe a captured response body into the example:
//!
//! ```sh
//! cargo run --example decode < response.bin
//! ```
//!
//! Pass `--strict` to verify both CRCs of every frame.

use eventstream_answer::{DecodeOptions, FrameReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = if std::env::args().any(|arg| arg == "--strict") {
        DecodeOptions::strict()
    } else {
        DecodeOptions::default()
    };

    let mut reader = FrameReader::with_options(tokio::io::stdin(), options);
    let mut last_answer = None;
    let mut count = 0usize;

    while let Some(frame) = reader.next_frame().await? {
        count += 1;
        let event_type = frame.event_type().unwrap_or("-");

        match frame.answer() {
            Ok(answer) => {
                println!("#{} {} {}", count, event_type, answer);
                last_answer = Some(answer);
            }
            Err(_) => println!("#{} {} ({} payload bytes)", count, event_type, frame.payload_len()),
        }
    }

    match last_answer {
        Some(answer) => println!("answer: {}", answer),
        None => eprintln!("no <answer> segment in {} frames", count),
    }

    Ok(())
}
