use clap::Parser as ClapParser;
use std::collections::HashMap;
use std::io::{self, Read};

use vellum_expr::{CompiledExpression, Context, Options, Variables, from_json, to_json};

#[derive(ClapParser)]
#[command(name = "vellum")]
#[command(about = "Vellum - an embedded expression language for document templates")]
#[command(version)]
struct Cli {
    /// The expression to evaluate
    expression: String,

    /// JSON object of variables (reads from stdin if not provided)
    #[arg(short, long)]
    vars: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate syntax, don't evaluate
    #[arg(long)]
    syntax_only: bool,

    /// Match the case of function and variable names exactly
    #[arg(long)]
    match_case: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(message) = run(&cli) {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = Options {
        ignore_case: !cli.match_case,
        ..Options::default()
    };
    let context = Context::new(options);

    let compiled = CompiledExpression::with_context(&cli.expression, context)
        .map_err(|err| err.to_string())?;

    if cli.syntax_only {
        println!("Syntax is valid");
        return Ok(());
    }

    let variables = read_variables(cli)?;
    let result = compiled.evaluate(&variables).map_err(|err| err.to_string())?;

    let json = to_json(&result);
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|err| err.to_string())?;
    println!("{}", rendered);

    Ok(())
}

fn read_variables(cli: &Cli) -> Result<Variables, String> {
    let source = match &cli.vars {
        Some(text) => Some(text.clone()),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| err.to_string())?;
            Some(buffer)
        }
        None => None,
    };

    let Some(source) = source else {
        return Ok(HashMap::new());
    };
    if source.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let document: serde_json::Value =
        serde_json::from_str(&source).map_err(|err| format!("invalid variables JSON: {}", err))?;
    let serde_json::Value::Object(map) = document else {
        return Err("variables must be a JSON object".to_string());
    };

    let mut variables = HashMap::new();
    for (name, value) in map {
        variables.insert(name, from_json(value));
    }
    Ok(variables)
}
