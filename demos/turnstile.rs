//! Turnstile State Machine
//!
//! The classic coin-operated turnstile: a coin unlocks it, a push locks
//! it again, and redundant events answer with suppressed
//! self-transitions.
//!
//! Key concepts:
//! - Type-matched transitions with action outputs
//! - Suppressed self-transitions (no enter/exit hooks)
//! - Machine-level unhandled notification
//!
//! Run with: cargo run --example turnstile

use flywheel::builder::{emit_output, MachineBuilder};
use flywheel::{event_set, state_enum};

state_enum! {
    enum Turnstile {
        Locked,
        Unlocked,
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Coin;

#[derive(Clone, Debug, PartialEq)]
struct Push;

event_set! {
    enum Input {
        Coin(Coin),
        Push(Push),
    }
}

#[derive(Default)]
struct Context {
    coins: u32,
}

fn main() {
    let mut builder: MachineBuilder<Turnstile, Input, String, Context> = MachineBuilder::new();
    builder.set_initial(Turnstile::Locked);
    builder.on_unhandled(|_ctx, state, _event| {
        println!("unhandled in state={state:?}");
    });

    builder.on::<Coin>(Turnstile::Locked, Turnstile::Unlocked, |_coin, ctx: &mut Context| {
        ctx.coins += 1;
        Some("coin accepted".to_string())
    });
    builder
        .from(Turnstile::Locked)
        .on::<Push>()
        .action(emit_output("locked".to_string()))
        .priority(1)
        .suppress_enter_exit(true)
        .to(Turnstile::Locked);
    builder.on::<Push>(
        Turnstile::Unlocked,
        Turnstile::Locked,
        emit_output("pass through".to_string()),
    );
    builder
        .from(Turnstile::Unlocked)
        .on::<Coin>()
        .action(emit_output("already unlocked".to_string()))
        .priority(1)
        .suppress_enter_exit(true)
        .to(Turnstile::Unlocked);

    let mut machine = builder.build(Context::default()).unwrap();

    let sequence = [
        Input::Push(Push),
        Input::Coin(Coin),
        Input::Push(Push),
        Input::Coin(Coin),
        Input::Coin(Coin),
        Input::Push(Push),
        Input::Push(Push),
    ];
    for event in sequence {
        if let Some(out) = machine.dispatch(&event) {
            println!("{out}");
        }
        println!(
            "state={:?} coins={}",
            machine.state(),
            machine.context().coins
        );
    }
}
