// src/main.rs
//
// moteur-expr : point d'entrée ligne de commande
// ----------------------------------------------
// - compile + évalue une expression, variables passées par -s NOM=VALEUR
// - --rpn  : affiche la RPN compilée au lieu d'évaluer
// - --vars : affiche les variables utilisées
// - erreurs : "erreur: <message>" sur stderr, code de sortie 1

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{debug, LevelFilter};

use moteur_expressions::{Expression, Result};

#[derive(Parser, Debug)]
#[command(
    name = "moteur-expr",
    version,
    about = "Évalue une expression (arithmétique, booléens, fonctions, variables)",
    after_help = r#"Exemples:
  moteur-expr "1 + 2 * 3"
  moteur-expr -s x=3 "IF(x > 2, MAX(x, 10), 0)"
  moteur-expr -s rayon=2 -s aire="PI * rayon^2" "aire"
  moteur-expr --rpn "2 ^ 3 ^ 2"

Journalisation : RUST_LOG=debug (ou -v)"#
)]
struct Cli {
    /// Lie une variable (nombre, ou sous-expression substituée dans le texte)
    #[arg(short = 's', long = "set", value_name = "NOM=VALEUR", value_parser = parse_liaison)]
    set: Vec<(String, String)>,

    /// Affiche la RPN compilée au lieu d'évaluer
    #[arg(long)]
    rpn: bool,

    /// Affiche les variables utilisées par l'expression
    #[arg(long)]
    vars: bool,

    /// Journalisation détaillée (debug)
    #[arg(short, long)]
    verbose: bool,

    /// Expression à évaluer
    expression: String,
}

fn parse_liaison(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((nom, valeur)) if !nom.trim().is_empty() => {
            Ok((nom.trim().to_string(), valeur.to_string()))
        }
        _ => Err(format!("liaison invalide {s:?} (attendu NOM=VALEUR)")),
    }
}

/* ------------------------ Exécution ------------------------ */

fn executer(cli: &Cli) -> Result<String> {
    let mut e = Expression::new(&cli.expression);
    for (nom, valeur) in &cli.set {
        e.set_variable(nom, valeur.as_str());
    }
    debug!("source courante : {:?}", e.source());

    if cli.vars {
        return Ok(e.used_variables()?.join(" "));
    }
    if cli.rpn {
        return e.to_rpn();
    }
    Ok(e.eval()?.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG prime ; -v force debug
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    match executer(&cli) {
        Ok(sortie) => {
            println!("{sortie}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("erreur: {err}");
            ExitCode::FAILURE
        }
    }
}
