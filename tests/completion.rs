//! Completion transitions: cascades, guarded splitters, priority
//! ordering, output adoption, and the divergence bound.

use flywheel::builder::MachineBuilder;
use flywheel::{event_set, state_enum};

#[derive(Clone, Debug, PartialEq)]
struct Start;

#[derive(Clone, Debug, PartialEq)]
struct Token;

event_set! {
    enum Input {
        Start(Start),
        Token(Token),
    }
}

#[test]
fn completion_cascade_runs_after_commit() {
    state_enum! {
        enum S {
            A,
            B,
            C,
        }
    }

    #[derive(Default)]
    struct Ctx {
        steps: u32,
    }

    let mut builder: MachineBuilder<S, Input, String, Ctx> = MachineBuilder::new();
    builder.set_initial(S::A);
    builder.from(S::A).on::<Start>().to(S::B);
    builder
        .completion(S::B)
        .action(|ctx: &mut Ctx| {
            ctx.steps = 1;
            Some("step".to_string())
        })
        .to(S::C);
    let mut machine = builder.build(Ctx::default()).unwrap();

    let out = machine.dispatch(&Input::Start(Start));
    assert_eq!(out.as_deref(), Some("step"));
    assert_eq!(machine.state(), &S::C);
    assert_eq!(machine.context().steps, 1);
}

#[test]
fn guarded_completions_split_on_context() {
    state_enum! {
        enum S {
            Idle,
            Setup,
            PathA,
            PathB,
        }
    }

    struct Ctx {
        choose_a: bool,
    }

    let build = |choose_a: bool| {
        let mut builder: MachineBuilder<S, Input, String, Ctx> = MachineBuilder::new();
        builder.set_initial(S::Idle);
        builder.from(S::Idle).on::<Start>().to(S::Setup);
        builder
            .completion(S::Setup)
            .guard(|ctx: &Ctx| ctx.choose_a)
            .action(|_ctx| Some("route to A".to_string()))
            .to(S::PathA);
        builder
            .completion(S::Setup)
            .guard(|ctx: &Ctx| !ctx.choose_a)
            .action(|_ctx| Some("route to B".to_string()))
            .to(S::PathB);
        builder.build(Ctx { choose_a }).unwrap()
    };

    let mut machine = build(true);
    assert_eq!(
        machine.dispatch(&Input::Start(Start)).as_deref(),
        Some("route to A")
    );
    assert_eq!(machine.state(), &S::PathA);

    let mut machine = build(false);
    assert_eq!(
        machine.dispatch(&Input::Start(Start)).as_deref(),
        Some("route to B")
    );
    assert_eq!(machine.state(), &S::PathB);
}

#[test]
fn action_output_beats_completion_output_and_priorities_sort() {
    state_enum! {
        enum S {
            Idle,
            BranchA,
            BranchB,
            Finish,
        }
    }

    let mut builder: MachineBuilder<S, Input, String, i32> = MachineBuilder::new();
    builder.set_initial(S::Idle);

    builder
        .from(S::Idle)
        .on_value(Input::Token(Token))
        .action(|_, ctx: &mut i32| {
            *ctx = 1;
            Some("first".to_string())
        })
        .priority(2)
        .to(S::BranchA);
    builder
        .from(S::Idle)
        .on_value(Input::Token(Token))
        .action(|_, ctx: &mut i32| {
            *ctx = 2;
            Some("second".to_string())
        })
        .priority(5)
        .to(S::BranchB);

    builder
        .completion(S::BranchB)
        .priority(1)
        .action(|ctx: &mut i32| {
            *ctx += 10;
            Some("B-complete".to_string())
        })
        .to(S::Finish);
    builder
        .completion(S::BranchB)
        .priority(0)
        .action(|ctx: &mut i32| {
            *ctx += 100;
            Some("B-late".to_string())
        })
        .to(S::BranchA);
    builder
        .completion(S::BranchA)
        .priority(3)
        .action(|ctx: &mut i32| {
            *ctx = 200;
            Some("A-top".to_string())
        })
        .to(S::Finish);
    builder
        .completion(S::BranchA)
        .priority(1)
        .action(|ctx: &mut i32| {
            *ctx = -50;
            Some("A-low".to_string())
        })
        .to(S::Idle);

    let mut machine = builder.build(0).unwrap();

    // Priority 5 transition wins; its action output survives even though
    // a completion also produced one.
    let out = machine.dispatch(&Input::Token(Token));
    assert_eq!(out.as_deref(), Some("second"));
    assert_eq!(machine.state(), &S::Finish);
    assert_eq!(machine.context(), &12); // 2 from action + 10 from completion
}

#[test]
fn completion_output_adopted_when_action_has_none() {
    state_enum! {
        enum S {
            A,
            B,
            C,
        }
    }

    let mut builder: MachineBuilder<S, Input, String> = MachineBuilder::new();
    builder.set_initial(S::A);
    builder.from(S::A).on::<Start>().to(S::B);
    builder
        .completion(S::B)
        .action(|_ctx| Some("from completion".to_string()))
        .to(S::C);
    let mut machine = builder.build(()).unwrap();

    assert_eq!(
        machine.dispatch(&Input::Start(Start)).as_deref(),
        Some("from completion")
    );
}

#[test]
fn completions_settle_at_construction() {
    state_enum! {
        enum S {
            Boot,
            Ready,
        }
    }

    let mut builder: MachineBuilder<S, Input, String> = MachineBuilder::new();
    builder.set_initial(S::Boot);
    builder.completion(S::Boot).to(S::Ready);
    let machine = builder.build(()).unwrap();

    assert_eq!(machine.state(), &S::Ready);
}

#[test]
fn cycling_completions_halt_at_the_step_bound() {
    state_enum! {
        enum S {
            A,
            B,
        }
    }

    #[derive(Default)]
    struct Ctx {
        fired: u32,
    }

    let mut builder: MachineBuilder<S, Input, String, Ctx> = MachineBuilder::new();
    builder.set_initial(S::A);
    builder
        .completion(S::A)
        .action(|ctx: &mut Ctx| {
            ctx.fired += 1;
            Some("ab".to_string())
        })
        .to(S::B);
    builder
        .completion(S::B)
        .action(|ctx: &mut Ctx| {
            ctx.fired += 1;
            Some("ba".to_string())
        })
        .to(S::A);

    // Construction must terminate despite the cycle; the bound is the
    // total completion count plus one, so the loop runs four steps and
    // settles back where it started.
    let machine = builder.build(Ctx::default()).unwrap();
    assert_eq!(machine.context().fired, 4);
    assert_eq!(machine.state(), &S::A);
}
