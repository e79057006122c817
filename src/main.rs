//! Tagsmith CLI
//!
//! Usage:
//!   tagsmith [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>     Render configuration (TOML format)
//!   -v, --vars <FILE>       Template variables (TOML format)
//!   -s, --set <KEY=VALUE>   Set one variable (repeatable)
//!   -t, --templates <DIR>   Add a layout/include search directory
//!   -m, --modules <DIR>     Add an import search directory
//!   --strict                Fail on missing layouts, includes and imports
//!   -d, --debug             Verbose render logging
//!   -g, --grammar           Show tag grammar reference
//!   --tags                  List registered tags and their patterns
//!   -h, --help              Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tagsmith::{
    ConfigError, Delimiters, Registry, RenderConfig, RenderError, Scope, Template, Value,
};

#[derive(Parser)]
#[command(name = "tagsmith")]
#[command(about = "Tag-based text templating engine")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Render configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template variables (TOML format)
    #[arg(short, long)]
    vars: Option<PathBuf>,

    /// Set a variable, e.g. --set name=World
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Add a layout/include search directory
    #[arg(short, long = "templates", value_name = "DIR")]
    templates: Vec<PathBuf>,

    /// Add an import search directory
    #[arg(short, long = "modules", value_name = "DIR")]
    modules: Vec<PathBuf>,

    /// Fail on missing layouts, includes and imports
    #[arg(long)]
    strict: bool,

    /// Verbose render logging (overrides RUST_LOG)
    #[arg(short, long)]
    debug: bool,

    /// Show tag grammar reference
    #[arg(short, long)]
    grammar: bool,

    /// List registered tags and their patterns
    #[arg(long)]
    tags: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let registry = Registry::with_defaults();

    if cli.grammar {
        print_grammar();
        return;
    }

    if cli.tags {
        print_tags(&registry);
        return;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let variables = match load_variables(&cli) {
        Ok(variables) => variables,
        Err(e) => {
            eprintln!("Error loading variables: {}", e);
            std::process::exit(1);
        }
    };

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut template = Template::new(&registry, config).with_variables(variables);
    match template.render(&source) {
        Ok(output) => {
            print!("{}", output);
        }
        Err(RenderError::Parse(errors)) => {
            for error in &errors {
                eprint!("{}", error.format(&source, &filename));
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("tagsmith=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<RenderConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::default(),
    };
    for dir in &cli.templates {
        config = config.with_templates_dir(dir);
    }
    for dir in &cli.modules {
        config = config.with_modules_dir(dir);
    }
    if cli.strict {
        config = config.with_strict_includes(true);
    }
    Ok(config)
}

fn load_variables(cli: &Cli) -> Result<Scope, String> {
    let mut variables = match &cli.vars {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("'{}': {}", path.display(), e))?;
            Scope::from_toml_str(&content).map_err(|e| format!("'{}': {}", path.display(), e))?
        }
        None => Scope::new(),
    };
    for assignment in &cli.set {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", assignment))?;
        variables.insert(key.trim(), Value::from_bare(value));
    }
    Ok(variables)
}

fn print_intro() {
    println!(
        r#"Tagsmith - Tag-based text templating engine

USAGE:
    tagsmith [OPTIONS] [FILE]
    echo '<template>' | tagsmith

OPTIONS:
    -c, --config      Render configuration (TOML file)
    -v, --vars        Template variables (TOML file)
    -s, --set         Set one variable (KEY=VALUE)
    -t, --templates   Layout/include search directory
    -m, --modules     Import search directory
    --strict          Fail on missing layouts, includes and imports
    -d, --debug       Verbose render logging
    -g, --grammar     Show tag grammar reference
    --tags            List registered tags
    -h, --help        Print help

QUICK START:
    echo 'Hello {{$name}}!' | tagsmith --set name=World

Run --grammar for the tag reference."#
    );
}

fn print_grammar() {
    let Delimiters { open, close } = Delimiters::default();
    println!(
        r#"TAGSMITH GRAMMAR
================

Delimiters default to {open} and {close} and can be changed in the config.

VARIABLES
---------
{open}$name{close}                      Value of name (dotted paths allowed)
{open}$name default="x"{close}          Fallback when name is unbound
{open}$name generator=lorem{close}      Generated text when name is unbound
{open}@current{close} {open}@index{close} {open}@key{close}    Loop bindings inside each
{open}@attempt{close}                   Attempt number inside until

EXPRESSIONS
-----------
{open}=upper(name){close}               Call a function, render the result
{open}=add(i, 1) -> i{close}            Assign the result, render nothing
{open}=f(x) silent=false{close}         Raise on failure instead of rendering ""
{open}=f(x) -> y global{close}          Assign into the template variables

BINDINGS
--------
{open}#let key=value ...{close}         Bind in the enclosing block
{open}#let n="3" type=number{close}     Coerce through a datatype
{open}#let key=value global=true{close} Bind in the template variables

BLOCKS
------
{open}#if var=x equals="ok"{close}...{open}/if{close}
{open}#while var=i lt=3{close}...{open}/while{close}
{open}#each items=list glue=", "{close}...{open}/each{close}
{open}#until validator=email attempts=3{close}...{open}/until{close}
{open}#await event=name{close}...{open}/await{close}
{open}#comment{close}...{open}/comment{close}

Comparisons: equals not_equals gt lt gte lte (no operator: truthiness)

DIRECTIVES
----------
@template(name)                     Wrap this page in a layout
@section(name)...@endsection        Fill a layout slot
@output(name)                       Emit a slot ("content" holds the page)
@macro(name param=default)...@endmacro
@invoke(name arg=value)
@include(file key=value)            Render a file from the templates path
@import(file)                       Load bindings and macros from a module"#
    );
}

fn print_tags(registry: &Registry) {
    for def in registry.tags.definitions() {
        let closing = def.closing().unwrap_or("-");
        println!("{:<10} {:<8} {}  {}", def.name(), def.kind().name(), def.pattern(), closing);
    }
}
