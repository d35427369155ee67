use std::path::PathBuf;

use video2sbv_decoder::{Backend, Configuration};

#[tokio::main]
async fn main() {
    let Some(input_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: video-info <video-file>");
        return;
    };

    let config = Configuration {
        backend: Backend::Ffmpeg,
        input: Some(input_path),
        channel_capacity: None,
    };

    match config.create_provider() {
        Ok(provider) => {
            let metadata = provider.metadata();

            println!("Backend: {}", config.backend.as_str());
            println!("Duration: {:?}", metadata.duration);
            println!("FPS: {:?}", metadata.fps);
            println!("Width: {:?}", metadata.width);
            println!("Height: {:?}", metadata.height);
            println!("Total Frames: {:?}", metadata.total_frames);
        }
        Err(err) => {
            eprintln!("Failed to create provider: {}", err);
        }
    }
}
