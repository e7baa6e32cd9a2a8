mod cli;

use ydl::binder::ClassRegistry;
use ydl::config::BinderConfig;
use ydl::documents::YdlDocuments;
use ydl::tree::Tree;
use ydl::value::Value;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("YDL_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Load(load_cli) => load(load_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn load(cli: cli::LoadCommand) -> anyhow::Result<()> {
    let config = config(&cli.input)?;
    let documents = documents(&cli.input)?;

    let registry = ClassRegistry::from_config(&config);
    let value = Tree::load(documents.merged(), &registry, config.syntax())?;

    output(&cli.output, &select(value, &cli.keys)?)?;
    Ok(())
}

fn config(input: &cli::InputArgs) -> anyhow::Result<BinderConfig> {
    match &input.config {
        Some(path) => Ok(BinderConfig::load(path)?),
        None => Ok(BinderConfig::default()),
    }
}

fn documents(input: &cli::InputArgs) -> anyhow::Result<YdlDocuments> {
    let mut documents = YdlDocuments::default();

    if input.is_empty() {
        let stdin = std::io::read_to_string(std::io::stdin())?;
        let value: Value = stdin.parse()?;
        documents.insert_tree(value, None)?;
        return Ok(documents);
    }

    if input.chain {
        documents.load_chain(&std::env::current_dir()?)?;
    }

    if input.workdir {
        documents.load_directory(&std::env::current_dir()?)?;
    }

    for file_path in &input.files {
        documents.load_file(file_path)?;
    }

    for dir_path in &input.directories {
        documents.load_directory(dir_path)?;
    }

    anyhow::ensure!(documents.source_count() > 0, "No files loaded");

    Ok(documents)
}

/// A single key selects its value, several keys a mapping of them
fn select(value: Value, keys: &[String]) -> anyhow::Result<Value> {
    let Value::Mapping(mut entries) = value else {
        anyhow::bail!("Resolved tree is not a mapping");
    };

    let mut selected = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(value) = entries.shift_remove(key) else {
            anyhow::bail!("No top-level key '{key}'");
        };
        selected.push((key.clone(), value));
    }

    Ok(match selected.len() {
        0 => Value::Mapping(entries),
        1 => selected.remove(0).1,
        _ => selected.into_iter().collect(),
    })
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (ydl-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    let config = config(&cli.input)?;
    let documents = documents(&cli.input)?;

    match cli.command {
        cli::DevSubCommand::Documents => println!("{documents:#?}"),
        cli::DevSubCommand::Tree => {
            let registry = ClassRegistry::from_config(&config);
            let tree = Tree::new(documents.merged(), &registry, config.syntax());
            println!("{tree:#?}")
        }
    }

    Ok(())
}
