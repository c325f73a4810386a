use super::{progress, run_lifecycle, Failure, Session};
use bbl_core::Up;
use bbl_state::StateConsistencyValidator;

pub fn run(session: &Session, args: &[String], json: bool) -> Result<u8, Failure> {
    let validator = StateConsistencyValidator::optional();
    let managers = &session.managers;
    let up = Up::new(
        &validator,
        managers.key_pair.as_ref(),
        managers.terraform.as_ref(),
        managers.bosh.as_ref(),
        &session.store,
    );
    let pb = progress(json);
    run_lifecycle("up", &up, &session.store, args, pb.as_ref())
}
