//! Deferral Gate
//!
//! Work items arriving while the machine is waiting are deferred and
//! replayed automatically once the staging state settles.
//!
//! Key concepts:
//! - Globally enabled deferral with per-transition defer marks
//! - FIFO replay when the target state is entered
//! - Context as the accumulator for drained work
//!
//! Run with: cargo run --example deferral_gate

use flywheel::builder::{emit_output, MachineBuilder};
use flywheel::{event_set, state_enum};

state_enum! {
    enum Gate {
        Waiting,
        Ready,
        Processing,
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Enqueue {
    id: u32,
}

#[derive(Clone, Debug, PartialEq)]
struct Tick;

event_set! {
    enum Input {
        Enqueue(Enqueue),
        Tick(Tick),
    }
}

#[derive(Default)]
struct Context {
    completed: Vec<u32>,
}

fn main() {
    let mut builder: MachineBuilder<Gate, Input, String, Context> = MachineBuilder::new();
    builder.set_initial(Gate::Waiting);
    builder.enable_deferral(true);

    builder
        .from(Gate::Waiting)
        .on::<Enqueue>()
        .defer(true)
        .to(Gate::Ready);

    builder.on::<Enqueue>(Gate::Ready, Gate::Processing, |e: &Enqueue, ctx: &mut Context| {
        println!("drain -> {}", e.id);
        ctx.completed.push(e.id);
        Some(format!("processing {}", e.id))
    });

    builder.on::<Tick>(
        Gate::Processing,
        Gate::Waiting,
        emit_output("done".to_string()),
    );

    let mut machine = builder.build(Context::default()).unwrap();

    let sequence = [
        Input::Enqueue(Enqueue { id: 1 }),
        Input::Tick(Tick),
        Input::Enqueue(Enqueue { id: 2 }),
        Input::Tick(Tick),
    ];
    for event in sequence {
        if let Some(out) = machine.dispatch(&event) {
            println!("{out}");
        }
        println!("state={:?}", machine.state());
    }

    for id in &machine.context().completed {
        println!("completed: {id}");
    }
}
