//! End-to-end coverage across crate boundaries: fund two wallets,
//! stake them into the same public queue, and confirm the pairing and
//! the escrowed stakes land where the concurrency model says they
//! should — the kind of test a single crate's unit suite can't express
//! on its own.

use stakeboard_core::types::{AccountType, QueueMode, ReferenceKind};
use stakeboard_matchmaker::PollOutcome;
use stakeboard_test_support::World;

async fn fund_wallet(world: &World, player_id: stakeboard_core::types::PlayerId, amount: i64) {
    let (_, wallet) = world.ledger.ensure_player_accounts(player_id).await.unwrap();
    let house = world.ledger.ensure_singleton_account(AccountType::HouseExpense).await.unwrap();
    world.ledger.transfer(house.id, wallet.id, amount, ReferenceKind::Deposit, "test-fund").await.unwrap();
}

#[tokio::test]
async fn two_players_stake_and_pair() {
    let world = World::new();

    let alice = world.seeded_player("+15555550100", "Alice", "1234").await;
    let bob = world.seeded_player("+15555550101", "Bob", "5678").await;
    fund_wallet(&world, alice.id, 10_000).await;
    fund_wallet(&world, bob.id, 10_000).await;

    let first = world.matchmaker.enqueue(alice.id, 1_000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
    assert!(first.matched.is_none(), "first entrant has nobody to pair with yet");

    let second = world.matchmaker.enqueue(bob.id, 1_000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
    let pairing = second.matched.expect("second entrant at the same stake pairs immediately");

    match world.matchmaker.poll_status(&first.queue_token).await.unwrap() {
        PollOutcome::Matched { game_token, player_token } => {
            assert_eq!(game_token, pairing.game_token);
            assert_ne!(player_token, pairing.player_token, "each seat gets its own token");
        }
        other => panic!("expected alice's poll to report matched, got {other:?}"),
    }

    // Default matchmaker commission is 10%, debited alongside the stake
    // and held in escrow until the match this entry joins terminates.
    let (_, alice_wallet) = world.ledger.ensure_player_accounts(alice.id).await.unwrap();
    let (_, bob_wallet) = world.ledger.ensure_player_accounts(bob.id).await.unwrap();
    assert_eq!(world.ledger.balance(alice_wallet.id).await.unwrap(), 8_900);
    assert_eq!(world.ledger.balance(bob_wallet.id).await.unwrap(), 8_900);

    let escrow = world.ledger.ensure_singleton_account(AccountType::Escrow).await.unwrap();
    assert_eq!(world.ledger.balance(escrow.id).await.unwrap(), 2_200);
}

#[tokio::test]
async fn cancelling_a_queued_stake_refunds_in_full() {
    let world = World::new();
    let alice = world.seeded_player("+15555550102", "Alice", "1234").await;
    fund_wallet(&world, alice.id, 5_000).await;

    let outcome = world.matchmaker.enqueue(alice.id, 1_000, QueueMode::Public, None, AccountType::PlayerWallet).await.unwrap();
    world.matchmaker.cancel_queue(&outcome.queue_token).await.unwrap();

    let (_, wallet) = world.ledger.ensure_player_accounts(alice.id).await.unwrap();
    assert_eq!(world.ledger.balance(wallet.id).await.unwrap(), 5_000);
}
