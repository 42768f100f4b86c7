use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use sysupdate_wizard::{AppConfig, Appliance};
use wizard_core::{PrivilegedExecutor, StepResult, WizardError, WizardRequest, WizardSession};
use wizard_integrity::{sha256_file, ArtifactKind};
use wizard_steps::{MountPoint, RecordingExecutor};

const USAGE: &str = "\
Uso:
  wizard-cli firmware    --mount <DIR> --file <PATH> --sha256 <HEX>
  wizard-cli servicepack --mount <DIR> --file <PATH> --sha256 <HEX>
  wizard-cli config      --file <PATH> --sha256 <HEX>
  wizard-cli form <firmware|servicepack|config> [--mount <DIR>]
  wizard-cli checksum <PATH>
  wizard-cli service <start|stop|restart> <NAME>

Las acciones privilegiadas se registran (dry run), no se ejecutan.";

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        exit(2);
    };
    let rest = &args[1..];
    let code = match command.as_str() {
        "firmware" => run_upload(ArtifactKind::Firmware, rest),
        "servicepack" => run_upload(ArtifactKind::ServicePack, rest),
        "config" => run_upload(ArtifactKind::Config, rest),
        "form" => run_form(rest),
        "checksum" => run_checksum(rest),
        "service" => run_service(rest),
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            0
        }
        other => {
            eprintln!("[wizard-cli] comando desconocido: {other}\n\n{USAGE}");
            2
        }
    };
    exit(code);
}

/// `--flag valor` → mapa; los argumentos sueltos van a `positional`.
fn parse_flags(args: &[String]) -> (HashMap<String, String>, Vec<String>) {
    let mut flags = HashMap::new();
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].strip_prefix("--") {
            Some(name) if i + 1 < args.len() => {
                flags.insert(name.to_string(), args[i + 1].clone());
                i += 1;
            }
            Some(name) => {
                eprintln!("[wizard-cli] falta el valor de --{name}");
            }
            None => positional.push(args[i].clone()),
        }
        i += 1;
    }
    (flags, positional)
}

fn load_appliance(executor: Arc<RecordingExecutor>) -> Result<Appliance, i32> {
    match AppConfig::from_env() {
        Ok(cfg) => {
            log::debug!("staging en {} (chunks de {} bytes)", cfg.staging_dir.display(), cfg.chunk_size);
            Ok(Appliance::new(cfg, executor))
        }
        Err(e) => {
            eprintln!("[wizard-cli] {e}");
            Err(5)
        }
    }
}

fn exit_code(err: &WizardError) -> i32 {
    match err {
        WizardError::MalformedRequest(_) | WizardError::StaleStep { .. } => 3,
        WizardError::IntegrityViolation { .. } | WizardError::SessionClosed => 4,
        _ => 5,
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("[wizard-cli] no se pudo serializar la respuesta: {e}"),
    }
}

/// La sesión viaja por el "cliente" entre peticiones.
fn through_client(session: &WizardSession) -> Result<WizardSession, i32> {
    let raw = serde_json::to_string(session);
    raw.and_then(|raw| serde_json::from_str(&raw)).map_err(|e| {
                                                       eprintln!("[wizard-cli] sesión ilegible: {e}");
                                                       5
                                                   })
}

fn run_upload(kind: ArtifactKind, args: &[String]) -> i32 {
    let (flags, _) = parse_flags(args);
    let (Some(file), Some(sha256)) = (flags.get("file"), flags.get("sha256")) else {
        eprintln!("{USAGE}");
        return 2;
    };
    let mount = flags.get("mount");
    if kind != ArtifactKind::Config && mount.is_none() {
        eprintln!("[wizard-cli] {kind} requiere --mount <DIR>");
        return 2;
    }

    let executor = Arc::new(RecordingExecutor::new());
    let app = match load_appliance(executor.clone()) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mounts: Vec<MountPoint> = mount.iter().map(|m| MountPoint::new(m.as_str())).collect();
    let mut engine = match app.wizard(kind, mounts) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("[wizard-cli] {e}");
            return 5;
        }
    };
    let stream = match File::open(file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[wizard-cli] no se pudo abrir {file}: {e}");
            return 5;
        }
    };

    let mut session = engine.start_session();
    let mut requests = Vec::new();
    if let Some(mount) = mount {
        let step = requests.len();
        requests.push(WizardRequest::for_step(step).with_field(format!("{}-mountpoint", engine.prefix_for_step(step)),
                                                               mount.as_str()));
    }
    let step = requests.len();
    let prefix = engine.prefix_for_step(step);
    requests.push(WizardRequest::for_step(step).with_field(format!("{prefix}-sha256"), sha256.as_str())
                                               .with_file(format!("{prefix}-{}", file_field(kind)), stream));

    for request in requests {
        session = match through_client(&session) {
            Ok(s) => s,
            Err(code) => return code,
        };
        match engine.handle(&mut session, request) {
            Ok(result) => {
                print_json(&result);
                if let StepResult::Redisplay { .. } = result {
                    return 3;
                }
            }
            Err(e) => {
                eprintln!("[wizard-cli] {e}");
                print_json(&executor.calls());
                return exit_code(&e);
            }
        }
    }
    print_json(&executor.calls());
    0
}

fn file_field(kind: ArtifactKind) -> &'static str {
    wizard_steps::upload::file_field(kind)
}

fn run_form(args: &[String]) -> i32 {
    let (flags, positional) = parse_flags(args);
    let kind = match positional.first().map(String::as_str) {
        Some("firmware") => ArtifactKind::Firmware,
        Some("servicepack") => ArtifactKind::ServicePack,
        Some("config") => ArtifactKind::Config,
        _ => {
            eprintln!("{USAGE}");
            return 2;
        }
    };
    let app = match load_appliance(Arc::new(RecordingExecutor::new())) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mounts: Vec<MountPoint> = flags.get("mount").into_iter().map(|m| MountPoint::new(m.as_str())).collect();
    let engine = match app.wizard(kind, mounts) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("[wizard-cli] {e}");
            return 5;
        }
    };
    let mut steps = Vec::new();
    for i in 0..engine.step_count() {
        match engine.form_for(i) {
            Ok(form) => steps.push(serde_json::json!({ "step_index": i,
                                                        "prefix": engine.prefix_for_step(i),
                                                        "templates": engine.template_names(i),
                                                        "multipart": form.is_multipart(),
                                                        "form": form })),
            Err(e) => {
                eprintln!("[wizard-cli] {e}");
                return 5;
            }
        }
    }
    print_json(&steps);
    0
}

fn run_checksum(args: &[String]) -> i32 {
    let Some(path) = args.first() else {
        eprintln!("{USAGE}");
        return 2;
    };
    match sha256_file(Path::new(path)) {
        Ok(digest) => {
            println!("{digest}  {path}");
            0
        }
        Err(e) => {
            eprintln!("[wizard-cli] {path}: {e}");
            5
        }
    }
}

fn run_service(args: &[String]) -> i32 {
    let (Some(action), Some(name)) = (args.first(), args.get(1)) else {
        eprintln!("{USAGE}");
        return 2;
    };
    let executor = RecordingExecutor::new();
    let result = match action.as_str() {
        "start" => executor.start(name),
        "stop" => executor.stop(name),
        "restart" => executor.restart(name),
        other => {
            eprintln!("[wizard-cli] acción de servicio desconocida: {other}");
            return 2;
        }
    };
    print_json(&executor.calls());
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("[wizard-cli] {e}");
            5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_and_positionals_are_split() {
        let (flags, positional) = parse_flags(&args(&["firmware", "--mount", "/mnt/tank", "--sha256", "ab"]));
        assert_eq!(positional, ["firmware"]);
        assert_eq!(flags.get("mount").map(String::as_str), Some("/mnt/tank"));
        assert_eq!(flags.get("sha256").map(String::as_str), Some("ab"));
    }

    #[test]
    fn dangling_flag_is_ignored() {
        let (flags, positional) = parse_flags(&args(&["--file"]));
        assert!(flags.is_empty());
        assert!(positional.is_empty());
    }

    #[test]
    fn integrity_errors_map_to_their_own_exit_code() {
        assert_eq!(exit_code(&WizardError::SessionClosed), 4);
        assert_eq!(exit_code(&WizardError::StaleStep { step_index: 0, current_step: 1 }), 3);
        assert_eq!(exit_code(&WizardError::Conflict("busy".into())), 5);
    }
}
