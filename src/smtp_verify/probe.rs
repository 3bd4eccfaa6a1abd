use std::sync::Arc;

use super::cancel::ProbeCancel;
use super::dial::Dialer;
use super::error::ProbeError;
use super::options::ProbeOptions;
use super::session::SmtpSession;
use super::types::{ProbeStage as Stage, ProbeVerdict};

/// Runs the non-delivering dialogue for `email` against `host`.
///
/// The connection is opened here and closed before returning, whatever the
/// outcome.
pub(crate) fn probe_host<D: Dialer + ?Sized>(
    dialer: &D,
    host: &str,
    email: &str,
    options: &ProbeOptions,
    cancel: &Arc<ProbeCancel>,
) -> ProbeVerdict {
    let mut session = match SmtpSession::connect(dialer, host, options, cancel) {
        Ok(session) => session,
        Err(err) => return ProbeVerdict::rejected(host, err, Vec::new()),
    };

    let outcome = dialogue(&mut session, email, options);
    if let Err(ProbeError::UnexpectedReply { .. }) = &outcome {
        session.abandon();
    }
    let transcript = session.finish();

    match outcome {
        Ok(()) => ProbeVerdict::accepted(host, transcript),
        Err(err) => ProbeVerdict::rejected(host, err, transcript),
    }
}

fn dialogue(session: &mut SmtpSession, email: &str, options: &ProbeOptions) -> Result<(), ProbeError> {
    session.expect(Stage::Greeting, None, &[220])?;
    session.expect(
        Stage::Helo,
        Some(&format!("HELO {}", options.helo_name())),
        &[250],
    )?;
    session.expect(
        Stage::MailFrom,
        Some(&format!("MAIL FROM:<{}>", options.mail_from())),
        &[250],
    )?;
    session.expect(Stage::RcptTo, Some(&format!("RCPT TO:<{email}>")), &[250])?;
    session.expect(Stage::Rset, Some("RSET"), &[250])?;
    session.expect(Stage::Quit, Some("QUIT"), &[221, 250])?;
    Ok(())
}
