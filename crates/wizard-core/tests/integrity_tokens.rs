use serde_json::json;
use wizard_core::{FieldErrors, FieldKind, FieldMap, FieldSpec, FileMap, SessionStatus, StepData, StepDefinition,
                  StepForm, StepResult, StepValidation, TokenSigner, ValidationContext, WizardEngine, WizardError,
                  WizardEventKind, WizardSession};

struct Choice {
    id: &'static str,
}

impl StepDefinition for Choice {
    fn id(&self) -> &str {
        self.id
    }
    fn form(&self) -> StepForm {
        StepForm::new(self.id, vec![FieldSpec::new("value", "Value", FieldKind::Text)])
    }
    fn validate(&self, _ctx: &ValidationContext<'_>, fields: &FieldMap, _files: &mut FileMap) -> Result<StepValidation, WizardError> {
        match fields.get("value") {
            Some(v) => {
                let mut d = StepData::new();
                d.insert("value".into(), json!(v));
                Ok(StepValidation::valid(d))
            }
            None => Ok(StepValidation::invalid(FieldErrors::new().with("value", "This field is required."))),
        }
    }
}

fn engine(secret: &str) -> WizardEngine<wizard_core::InMemoryEventStore> {
    WizardEngine::builder().step(Choice { id: "first" })
                           .step(Choice { id: "second" })
                           .step(Choice { id: "third" })
                           .signer(TokenSigner::from_secret(secret))
                           .build()
                           .expect("engine")
}

fn value(v: &str) -> FieldMap {
    let mut f = FieldMap::new();
    f.insert("value".into(), v.into());
    f
}

/// Simula el viaje de la sesión por el cliente: serializa, aplica `mutate`
/// sobre el JSON y deserializa.
fn round_trip(session: &WizardSession, mutate: impl FnOnce(&mut serde_json::Value)) -> WizardSession {
    let mut raw = serde_json::to_value(session).expect("serialize");
    mutate(&mut raw);
    serde_json::from_value(raw).expect("deserialize")
}

#[test]
fn untouched_round_trip_is_accepted() {
    let mut eng = engine("k");
    let mut session = eng.start_session();
    eng.submit_step(&mut session, 0, &value("a"), &mut FileMap::new()).unwrap();
    let mut session = round_trip(&session, |_| {});
    let r = eng.submit_step(&mut session, 1, &value("b"), &mut FileMap::new()).unwrap();
    assert_eq!(r, StepResult::Advance { next_step_index: 2 });
}

#[test]
fn mutating_any_committed_step_is_an_integrity_violation() {
    for tampered_step in 0..2usize {
        let mut eng = engine("k");
        let mut session = eng.start_session();
        eng.submit_step(&mut session, 0, &value("a"), &mut FileMap::new()).unwrap();
        eng.submit_step(&mut session, 1, &value("b"), &mut FileMap::new()).unwrap();

        let key = tampered_step.to_string();
        let mut session = round_trip(&session, |raw| {
            raw["committed"][key.as_str()]["value"] = json!("forged");
        });
        let err = eng.submit_step(&mut session, 2, &value("c"), &mut FileMap::new()).unwrap_err();
        assert!(matches!(err, WizardError::IntegrityViolation { step_index: Some(i), .. } if i == tampered_step),
                "got {err:?}");
        assert_eq!(session.status(), SessionStatus::Aborted);
        assert!(session.committed_data(2).is_none());
    }
}

#[test]
fn tampered_token_aborts_and_records_no_commit() {
    let mut eng = engine("k");
    let mut session = eng.start_session();
    eng.submit_step(&mut session, 0, &value("a"), &mut FileMap::new()).unwrap();
    let mut session = round_trip(&session, |raw| {
        let t = raw["tokens"]["0"].as_str().unwrap().to_string();
        let flipped = if t.starts_with('0') { format!("1{}", &t[1..]) } else { format!("0{}", &t[1..]) };
        raw["tokens"]["0"] = json!(flipped);
    });
    let err = eng.submit_step(&mut session, 1, &value("b"), &mut FileMap::new()).unwrap_err();
    assert!(err.aborts_session());
    assert!(session.committed_data(1).is_none());
    assert!(eng.events_for(session.session_id())
               .iter()
               .any(|e| matches!(e.kind, WizardEventKind::IntegrityViolation { step_index: Some(0), .. })));
    // una vez abortada, la sesión no acepta más envíos
    assert_eq!(eng.submit_step(&mut session, 1, &value("b"), &mut FileMap::new()).unwrap_err(),
               WizardError::SessionClosed);
}

#[test]
fn tokens_do_not_verify_under_another_key() {
    let mut a = engine("key-a");
    let mut b = engine("key-b");
    let mut session = a.start_session();
    a.submit_step(&mut session, 0, &value("a"), &mut FileMap::new()).unwrap();
    let err = b.submit_step(&mut session, 1, &value("b"), &mut FileMap::new()).unwrap_err();
    assert!(matches!(err, WizardError::IntegrityViolation { .. }));
}

#[test]
fn skipping_ahead_is_rejected() {
    let mut eng = engine("k");
    let mut session = eng.start_session();
    eng.submit_step(&mut session, 0, &value("a"), &mut FileMap::new()).unwrap();
    let err = eng.submit_step(&mut session, 2, &value("c"), &mut FileMap::new()).unwrap_err();
    assert!(matches!(err, WizardError::IntegrityViolation { step_index: Some(1), .. }), "got {err:?}");
}

#[test]
fn forged_cursor_is_rejected() {
    let mut eng = engine("k");
    let mut session = eng.start_session();
    eng.submit_step(&mut session, 0, &value("a"), &mut FileMap::new()).unwrap();
    let mut session = round_trip(&session, |raw| raw["current_step"] = json!(2));
    let err = eng.submit_step(&mut session, 2, &value("c"), &mut FileMap::new()).unwrap_err();
    assert!(matches!(err, WizardError::IntegrityViolation { step_index: None, .. }), "got {err:?}");
}

#[test]
fn session_of_other_definition_is_rejected() {
    let mut other = WizardEngine::builder().step(Choice { id: "only" })
                                           .signer(TokenSigner::from_secret("k"))
                                           .build()
                                           .unwrap();
    let mut eng = engine("k");
    let mut foreign = other.start_session();
    let err = eng.submit_step(&mut foreign, 0, &value("a"), &mut FileMap::new()).unwrap_err();
    assert!(matches!(err, WizardError::IntegrityViolation { step_index: None, .. }));
}
