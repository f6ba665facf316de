use std::process;
#[macro_use]
extern crate log;

use rust_decimal_macros::dec;

mod features;
use features::{
    AllowListPolicy, LedgerEngine, MemoryStore, TransactionKind, UserAccount, UserId, UserStore,
};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let alice = UserId::new("alice@example.com");
    let bob = UserId::new("bob@example.com");
    let admin = UserId::new("admin@example.com");
    store.create_user(UserAccount::new(alice.clone()).with_referral_code("ALICE-2024"));
    store.create_user(UserAccount::new(bob.clone()));

    let engine = LedgerEngine::new(store, AllowListPolicy::new([admin.clone()]));

    let (deposit, balance) = engine.submit_deposit(&alice, dec!(100), "card")?;
    info!("alice's balance is still {balance} while her deposit is pending");
    engine.approve(&admin, &alice, deposit.id, TransactionKind::Deposit)?;

    // Nothing to withdraw yet on bob's side: refused at submission.
    if let Err(e) = engine.submit_withdrawal(&bob, dec!(80), "bank-transfer", "NL91ABNA0417164300")
    {
        warn!("{e}");
    }

    let (withdrawal, _) =
        engine.submit_withdrawal(&alice, dec!(40), "bank-transfer", "NL91ABNA0417164300")?;
    engine.approve(&admin, &alice, withdrawal.id, TransactionKind::Withdrawal)?;

    // A second decision on the same transaction is refused and has no effect.
    if let Err(e) = engine.approve(&admin, &alice, withdrawal.id, TransactionKind::Withdrawal) {
        warn!("{e}");
    }

    let kind: TransactionKind = "deposit".parse()?;
    let (pending_deposit, _) = engine.submit_deposit(&bob, dec!(25), "crypto")?;
    for pending in engine.list_pending(&admin)? {
        info!(
            "pending {} of {} from {}",
            pending.kind, pending.transaction.amount, pending.user_id
        );
    }
    engine.reject(&admin, &bob, pending_deposit.id, kind)?;

    if let Some(referred) = engine.store().find_user_by_referral_code("ALICE-2024")? {
        info!("referral code ALICE-2024 belongs to {referred}");
    }

    let accounts = engine.store().list_users()?;
    println!("{}", serde_json::to_string_pretty(&accounts)?);

    Ok(())
}
