use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use batmi::{
    gemini::GeminiClient,
    generation::{Narration, Narrator, Voice},
    output,
    player::{AudioEngine, Player},
    share,
    storage::{self, API_KEY_ENV},
};
use log::{error, info, warn};

const USAGE: &str = "usage: batmi [--voice NAME] [--out DIR] [--play] <news.txt | ->";

struct Args {
    input: String,
    voice: Option<Voice>,
    out: Option<PathBuf>,
    play: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut input = None;
    let mut voice = None;
    let mut out = None;
    let mut play = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--voice" => voice = Some(Voice::new(args.next().ok_or("--voice needs a value")?)),
            "--out" => out = Some(PathBuf::from(args.next().ok_or("--out needs a value")?)),
            "--play" => play = true,
            "-h" | "--help" => return Err(USAGE.into()),
            _ if input.is_none() => input = Some(arg),
            _ => return Err(format!("unexpected argument {}\n{}", arg, USAGE)),
        }
    }

    Ok(Args {
        input: input.ok_or(USAGE)?,
        voice,
        out,
        play,
    })
}

fn read_news(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
    }
}

fn progress_line(position: f64, duration: f64) -> String {
    format!("\r▶ {:.1}s / {:.1}s", position, duration)
}

async fn play_narration(narration: &Narration) -> Result<(), Box<dyn std::error::Error>> {
    let engine = AudioEngine::open(output::default_output()?, narration.sample_rate)?;
    let mut player = Player::new(engine);
    let mut progress = player.subscribe();

    player.play(narration.buffer.clone())?;
    if !player.is_playing() {
        info!("nothing to play");
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
                let p = *progress.borrow_and_update();
                print!("{}", progress_line(p.position.as_secs_f64(), p.duration.as_secs_f64()));
                stdout.flush()?;
                if !p.is_playing() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                player.stop();
                break;
            }
        }
    }
    println!();
    Ok(())
}

async fn run_batmi() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = storage::load_config()?;

    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| format!("no API key: set {} or api_key in config.json", API_KEY_ENV))?;

    let voice = args.voice.unwrap_or_else(|| config.voice.clone());
    if !voice.is_prebuilt() {
        warn!("voice {} is not a known prebuilt voice", voice);
    }

    let news = read_news(&args.input)?;

    let client = Arc::new(
        GeminiClient::new(api_key)
            .with_base_url(config.base_url.clone())
            .with_models(config.script_model.clone(), config.speech_model.clone()),
    );
    let narrator = Narrator::new(client.clone(), client);

    let narration = narrator.generate(&news, &voice).await?;
    println!("{}\n", narration.script);

    let out_dir = match args.out.or(config.output_dir) {
        Some(dir) => dir,
        None => storage::default_output_dir()?,
    };
    let path = storage::save_wav(&out_dir, &narration.to_wav()?)?;
    info!(
        "narration is {:.1}s long, saved to {}",
        narration.buffer.duration_secs(),
        path.display()
    );

    println!("saved {}", path.display());
    println!("share: {}", share::whatsapp_link(&share::share_message(&narration.script))?);

    if args.play {
        play_narration(&narration).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run_batmi().await {
        error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags_and_input() {
        let parsed = args(&["--voice", "Puck", "news.txt", "--out", "/tmp/x"]).unwrap();
        assert_eq!(parsed.input, "news.txt");
        assert_eq!(parsed.voice, Some(Voice::new("Puck")));
        assert_eq!(parsed.out, Some(PathBuf::from("/tmp/x")));
        assert!(!parsed.play);

        let parsed = args(&["--play", "-"]).unwrap();
        assert_eq!(parsed.input, "-");
        assert!(parsed.play);
    }

    #[test]
    fn progress_line_rewrites_in_place() {
        assert_eq!(progress_line(1.5, 12.0), "\r▶ 1.5s / 12.0s");
    }

    #[test]
    fn rejects_missing_values_and_extra_inputs() {
        assert!(args(&[]).is_err());
        assert!(args(&["news.txt", "--voice"]).is_err());
        assert!(args(&["a.txt", "b.txt"]).is_err());
    }
}
