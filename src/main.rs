use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use autosky::replace::ModelReplacementTable;
use autosky::service::{GenerationOutcome, GenerationService};
use autosky::settings::{Settings, SettingsStore};
use autosky::sky::PipelineSettings;

fn main() {
    env_logger::init();

    let matches = App::new("AutoSky")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generates a 3D skybox from the AutoSky visgroup of a VMF map.")
        .setting(AppSettings::ArgsNegateSubcommands)
        .arg(Arg::with_name("config-dir")
            .long("config-dir")
            .value_name("FOLDER")
            .help("Sets the folder holding config.json and modelreplace.json")
            .takes_value(true)
            .global(true))
        .arg(Arg::with_name("input")
            .long("input")
            .short("i")
            .value_name("FILE")
            .help("Sets input map")
            .takes_value(true))
        .arg(Arg::with_name("output")
            .long("output")
            .short("o")
            .value_name("FILE")
            .help("Sets output file")
            .takes_value(true))
        .arg(Arg::with_name("skybox-only")
            .long("skybox-only")
            .help("writes only the skybox instead of merging it into the input map")
            .conflicts_with("merge"))
        .arg(Arg::with_name("merge")
            .long("merge")
            .help("merges the skybox into a copy of the input map"))
        .arg(Arg::with_name("replace-models")
            .long("replace-models")
            .help("replaces prop models using the model replacement index")
            .conflicts_with("no-replace-models"))
        .arg(Arg::with_name("no-replace-models")
            .long("no-replace-models")
            .help("keeps prop models as they are"))
        .arg(Arg::with_name("copy-fog")
            .long("copy-fog")
            .help("copies the map's env_fog_controller settings to the sky_camera")
            .conflicts_with("no-copy-fog"))
        .arg(Arg::with_name("no-copy-fog")
            .long("no-copy-fog")
            .help("keeps the sky_camera's default fog"))
        .arg(Arg::with_name("yes")
            .long("yes")
            .short("y")
            .help("answers yes to every question"))
        .subcommand(SubCommand::with_name("models")
            .about("Shows or edits the model replacement index")
            .setting(AppSettings::SubcommandRequiredElseHelp)
            .subcommand(SubCommand::with_name("list")
                .about("Lists every replacement"))
            .subcommand(SubCommand::with_name("add")
                .about("Adds a replacement")
                .arg(Arg::with_name("model").required(true).help("Model found in the map"))
                .arg(Arg::with_name("replacement").required(true).help("Skybox model to use instead")))
            .subcommand(SubCommand::with_name("remove")
                .about("Removes a user replacement")
                .arg(Arg::with_name("model").required(true))))
        .get_matches();

    let store = match matches.value_of_os("config-dir").map(PathBuf::from).or_else(SettingsStore::default_dir) {
        Some(dir) => SettingsStore::new(dir),
        None => {
            println!("error: no config folder available, use --config-dir");
            std::process::exit(-1)
        }
    };
    let mut table = match store.load_table() {
        Ok(table) => table,
        Err(error) => {
            println!("error: {}", error);
            std::process::exit(-1)
        }
    };

    if let Some(models) = matches.subcommand_matches("models") {
        edit_models(models, &store, &mut table);
        return;
    }

    let mut settings = match store.load_settings() {
        Ok(settings) => settings,
        Err(error) => {
            println!("error: {}", error);
            std::process::exit(-1)
        }
    };
    apply_arguments(&matches, &mut settings);
    if let Err(error) = store.save_settings(&settings) {
        println!("warning: could not save settings: {}", error);
    }

    println!("Generating skybox from {} to {}", settings.input_path, settings.output_path);
    println!("Mode [{}]", if settings.skybox_only { "SKYBOX ONLY" } else { "MERGE" });
    println!("Model replacement [{}]", if settings.replace_models { "ENABLED" } else { "DISABLED" });
    println!("Copy fog settings [{}]", if settings.copy_fog_settings { "ENABLED" } else { "DISABLED" });
    println!();

    let auto_yes = matches.is_present("yes");
    let service = GenerationService::new(table, PipelineSettings::default());
    let (sender, receiver) = async_std::channel::unbounded();

    let outcome = async_std::task::block_on(async {
        let printer = async_std::task::spawn(async move {
            while let Ok(stage) = receiver.recv().await {
                println!("{}...", stage);
            }
        });
        let outcome = service.generate(settings.generation_config(), move |title: &str, message: &str| {
            auto_yes || ask(title, message)
        }, sender).await;
        printer.await;
        outcome
    });

    println!("{}", outcome);
    if let GenerationOutcome::Failed(_) = outcome {
        std::process::exit(-1)
    }
}

/// Command line values override the saved ones and are saved for next time
fn apply_arguments(matches: &ArgMatches, settings: &mut Settings) {
    if let Some(input) = matches.value_of("input") {
        settings.input_path = input.to_string();
    }
    if let Some(output) = matches.value_of("output") {
        settings.output_path = output.to_string();
    }
    if matches.is_present("skybox-only") {
        settings.skybox_only = true;
    } else if matches.is_present("merge") {
        settings.skybox_only = false;
    }
    if matches.is_present("replace-models") {
        settings.replace_models = true;
    } else if matches.is_present("no-replace-models") {
        settings.replace_models = false;
    }
    if matches.is_present("copy-fog") {
        settings.copy_fog_settings = true;
    } else if matches.is_present("no-copy-fog") {
        settings.copy_fog_settings = false;
    }
}

fn ask(title: &str, message: &str) -> bool {
    print!("{}: {} [y/N] ", title, message);
    std::io::stdout().flush().unwrap_or_default();  // Error discarded; The question is still answered on stdin
    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn edit_models(matches: &ArgMatches, store: &SettingsStore, table: &mut ModelReplacementTable) {
    let result = match matches.subcommand() {
        ("list", _) => {
            for entry in table.entries() {
                println!("{} -> {} ({})", entry.model, entry.replacement, entry.source);
            }
            println!("{} replacement(s)", table.len());
            return;
        }
        ("add", Some(add)) => {
            let (model, replacement) = (add.value_of("model").unwrap_or_default(), add.value_of("replacement").unwrap_or_default());
            table.add(model, replacement).map(|_| println!("Added {} -> {}", model, replacement))
        }
        ("remove", Some(remove)) => {
            let model = remove.value_of("model").unwrap_or_default();
            table.remove(model).map(|removed| if removed {
                println!("Removed {}", model)
            } else {
                println!("{} has no replacement", model)
            })
        }
        _ => return,
    };

    if let Err(error) = result.and_then(|_| store.save_table(table)) {
        println!("error: {}", error);
        std::process::exit(-1)
    }
}
