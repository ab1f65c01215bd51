//! Feeding one webhook delivery through the engine.

use std::io::{self, Read};

use jiff::Timestamp;

use crate::{
    github::PullRequestHost,
    lifecycle::Lifecycle,
    webhook::{self, Delivery},
};

pub(super) fn run<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    secret: &str,
    event: Option<&str>,
    signature: Option<&str>,
) -> Result<(), String> {
    let mut body = Vec::new();
    io::stdin()
        .read_to_end(&mut body)
        .map_err(|e| format!("failed to read delivery from stdin: {e}"))?;

    let delivery = Delivery {
        signature,
        event,
        body: &body,
    };
    let response = webhook::receive(lifecycle, secret, delivery, Timestamp::now())
        .map_err(|e| format!("{} {e}", e.status_code()))?;

    let body = response
        .body()
        .map_err(|e| format!("failed to encode response: {e}"))?;
    println!("{body}");
    Ok(())
}
