//! End-to-end demo against the in-process dev backends.
//!
//! Walks the full connection lifecycle: discovery, fingerprint verification,
//! capability negotiation, onboarding (optionally through the faucet drip)
//! and finally one transaction submission with live progress output.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use common::{CallBundle, CapabilityManifest, ContractAddress, ContractCall};
use connect::{
    load_or_create, negotiate_capabilities, BackendProvider, Discovery, SecureChannelNegotiator,
    Session, SessionManager,
};
use onboarding::{OnboardingFlow, OnboardingStatus};
use pipeline::{ProgressBroadcaster, TransactionPipeline, TxWait};

use crate::dev::{
    DevCredentialStore, DevDrip, DevLedger, DevProber, DevProvider, DevRegistrar, DevSigner,
    DEV_CHAIN, DRIP_SECRET,
};

const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(500);

pub async fn run_demo(zero_balance: bool, secret: Option<String>) -> Result<()> {
    // Embedded signer from (demo-local) persisted credentials.
    let store = DevCredentialStore::default();
    let material = load_or_create(&store, || b"dev embedded key material".to_vec())
        .await
        .context("loading embedded signer credentials")?;
    let manager = SessionManager::new(Session::embedded(Arc::new(DevSigner::from_material(
        &material,
    ))));

    // Discovery: enumerate dev backends on the demo chain.
    let provider: Arc<dyn BackendProvider> = Arc::new(DevProvider::new());
    let discovery = Discovery::new(vec![Arc::clone(&provider)]);
    let mut session = discovery
        .discover(DEV_CHAIN, DISCOVERY_TIMEOUT)
        .context("starting discovery")?;
    let backend = session
        .next()
        .await
        .context("no signer backend found on the demo chain")?;
    println!("discovered backend: {} ({})", backend.name, backend.id);
    session.cancel();

    // Handshake: show the fingerprint, then confirm. A real application
    // waits for the user to compare grids; the demo confirms immediately.
    let negotiator = SecureChannelNegotiator::new("wallet-connect-demo", Arc::clone(&manager));
    let mut pending = negotiator
        .initiate(&provider, backend)
        .await
        .context("negotiating secure channel")?;
    println!("\nverify this fingerprint against the signer:\n{}\n", pending.fingerprint());
    let active = negotiator
        .confirm(&provider, &mut pending)
        .await
        .context("confirming secure channel")?;

    // Capability negotiation: one manifest, one prompt.
    let manifest = CapabilityManifest::new()
        .with_accounts()
        .register(ContractAddress("counter".into()))
        .register(ContractAddress("faucet".into()))
        .simulate(ContractAddress("counter".into()))
        .transact(ContractAddress("counter".into()))
        .transact(ContractAddress("faucet".into()));
    let grant = negotiate_capabilities(&active, manifest)
        .await
        .context("negotiating capabilities")?;
    println!("granted accounts: {:?}", grant.accounts);

    // Shared pipeline for the drip and the final submission.
    let pipeline = Arc::new(TransactionPipeline::new(
        Arc::new(DevLedger),
        ProgressBroadcaster::new(),
    ));

    // Onboarding, with the balance chosen by the flag.
    let balance = if zero_balance { 0 } else { 1_000 };
    let flow = OnboardingFlow::new(
        Arc::clone(&manager),
        Arc::new(DevRegistrar),
        Arc::new(DevProber { balance }),
        Arc::new(DevDrip::new(Arc::clone(&manager), Arc::clone(&pipeline))),
    );
    flow.start(false).await?;
    flow.session_ready().await;

    let mut status = flow.status().await;
    loop {
        let next = flow.drive().await?;
        let info = flow.step_info().await;
        println!("onboarding: {:?} (step {}/{})", next, info.current, info.total);
        if next == status {
            break;
        }
        status = next;
    }

    if status == OnboardingStatus::AwaitingDrip {
        let Some(secret) = secret else {
            println!(
                "\naccount is empty; rerun with --zero-balance --secret {DRIP_SECRET} \
                 to claim the faucet drip"
            );
            return Ok(());
        };
        flow.supply_secret(secret).await;
        status = flow.drive().await?;
        println!("onboarding: {:?}", status);
    }
    if status != OnboardingStatus::Completed {
        if let Some(message) = flow.state().await.error {
            anyhow::bail!("onboarding did not complete: {message}");
        }
        anyhow::bail!("onboarding did not complete (status {status:?})");
    }

    // One real submission with live progress output.
    let mut progress = pipeline.events().subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = progress.next().await {
            match &event.error {
                Some(message) => println!("  [{}] {}", event.phase.as_str(), message),
                None => println!("  [{}]", event.phase.as_str()),
            }
        }
    });

    let bundle = CallBundle::new(vec![ContractCall::new(
        ContractAddress("counter".into()),
        "increment",
    )]);
    let fee = pipeline.recommended_fee().await?;
    println!("\nsubmitting demo transaction:");
    let outcome = pipeline
        .submit(
            &manager.active(),
            bundle,
            fee,
            TxWait::Inclusion { timeout: None },
        )
        .await?;
    println!(
        "included {} at block {:?}",
        outcome.identity,
        outcome.inclusion.and_then(|i| i.block_height)
    );

    // Let the printer flush the queued events, then stop it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    let _ = printer.await;
    Ok(())
}
