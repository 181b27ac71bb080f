//! Intra-procedural end-to-end scenarios: loop bounding, switch
//! refinement, indirect switches, and unknown-call havoc.

mod common;

use common::{Event, PathDom, Recorder, hits, mark, reset_hits};
use sift_interpreter::{Analyzer, ExecOpts};
use sift_ir::{Call, Exp, Inst, Jump, Program, Term, Var};
use sift_vset::VSet;

/// `entry -> A -> B -> A (retreating) -> exit`, bound 2: the loop body is
/// explored at loop depths 0, 1 and 2, then pruned.
#[test]
fn loop_is_explored_bound_plus_one_times() {
    reset_hits();
    let mut b = Program::builder();
    let entry = b.block("entry");
    let a = b.block("A");
    let body = b.block("B");
    let exit = b.block("exit");
    b.define(entry).term(Term::goto(a));
    b.define(a).inst(mark("A")).term(Term::Switch {
        key: Exp::var("k"),
        tbl: vec![(Exp::Int(1), Jump::to(body))],
        els: Jump::to(exit),
    });
    b.define(body).inst(mark("B")).term(Term::goto(a));
    b.define(exit).inst(mark("exit")).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    let mut analyzer: Analyzer<'_, PathDom> =
        Analyzer::new(&pgm, ExecOpts::default().with_bound(2));
    analyzer.exec_pgm().unwrap();

    assert_eq!(hits("A"), 3);
    assert_eq!(hits("B"), 3);
    assert_eq!(hits("exit"), 3);
}

/// Switch on `k` with cases `{1 -> A, 2 -> B} else C`, where joining two
/// paths gives `k in {1, 3}`: edges go to `A` and to `C`, never to `B`.
#[test]
fn switch_default_takes_the_unmatched_values() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let one = b.block("one");
    let three = b.block("three");
    let merge = b.block("merge");
    let case_a = b.block("A");
    let case_b = b.block("B");
    let case_c = b.block("C");
    let exit = b.block("exit");
    b.define(entry)
        .inst(Inst::nondet(Some(Var::new("j")), "choice"))
        .term(Term::Switch {
            key: Exp::var("j"),
            tbl: vec![(Exp::Int(0), Jump::to(one))],
            els: Jump::to(three),
        });
    b.define(one)
        .inst(Inst::move_("k", Exp::Int(1)))
        .term(Term::goto(merge));
    b.define(three)
        .inst(Inst::move_("k", Exp::Int(3)))
        .term(Term::goto(merge));
    b.define(merge).term(Term::Switch {
        key: Exp::var("k"),
        tbl: vec![(Exp::Int(1), Jump::to(case_a)), (Exp::Int(2), Jump::to(case_b))],
        els: Jump::to(case_c),
    });
    b.define(case_a).term(common::call_to("sink_a", exit));
    b.define(case_b).term(common::call_to("sink_b", exit));
    b.define(case_c).term(common::call_to("sink_c", exit));
    b.define(exit).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    let recorder = Recorder::default();
    let mut analyzer = Analyzer::<'_, VSet>::new(&pgm, ExecOpts::default())
        .with_reporter(recorder.clone());
    analyzer.exec_pgm().unwrap();

    // The sinks are undefined, so each reached case reports one unknown
    // call: A and C, in deterministic block order, and never B.
    assert_eq!(
        recorder.events(),
        vec![Event::UnknownCall(case_a), Event::UnknownCall(case_c)]
    );
}

/// An indirect switch only follows targets whose label the pointer may
/// hold.
#[test]
fn iswitch_prunes_infeasible_targets() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let t1 = b.block("t1");
    let t2 = b.block("t2");
    let exit = b.block("exit");
    b.define(entry)
        .inst(Inst::move_("p", Exp::Label(t1)))
        .term(Term::Iswitch {
            ptr: Exp::var("p"),
            tbl: vec![Jump::to(t1), Jump::to(t2)],
        });
    b.define(t1).term(common::call_to("sink_1", exit));
    b.define(t2).term(common::call_to("sink_2", exit));
    b.define(exit).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    let recorder = Recorder::default();
    let mut analyzer = Analyzer::<'_, VSet>::new(&pgm, ExecOpts::default())
        .with_reporter(recorder.clone());
    analyzer.exec_pgm().unwrap();

    assert_eq!(recorder.events(), vec![Event::UnknownCall(t1)]);
}

/// Calling an undefined function reports one diagnostic, kills the return
/// variable, and continues at the return site — where the killed variable
/// is now an invalid access.
#[test]
fn unknown_callee_is_havocked() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let after = b.block("after");
    let exit = b.block("exit");
    b.define(entry)
        .inst(Inst::move_("r", Exp::Int(5)))
        .term(Term::Call(Call {
            callee: Exp::Func("mystery".into()),
            args: vec![Exp::var("r")],
            areturn: Some(Var::new("r")),
            retn: Jump::to(after),
            throw: None,
            recursive: false,
        }));
    b.define(after)
        .inst(Inst::load("t", Exp::var("r")))
        .term(Term::goto(exit));
    b.define(exit).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    // `mystery` is declared but has no body.
    b.func().name("mystery").freturn(Var::new("mystery.ret")).new().unwrap();
    let pgm = b.finish().unwrap();

    let recorder = Recorder::default();
    let mut analyzer = Analyzer::<'_, VSet>::new(&pgm, ExecOpts::default())
        .with_reporter(recorder.clone());
    analyzer.exec_pgm().unwrap();

    // Had `r` survived the call, the load would be fine: the invalid
    // access at `after` is the evidence that the havoc killed it.
    assert_eq!(
        recorder.events(),
        vec![Event::UnknownCall(entry), Event::InvalidInst(after)]
    );
}

/// An unreachable terminator ends the path without fuss.
#[test]
fn unreachable_skips() {
    reset_hits();
    let mut b = Program::builder();
    let entry = b.block("entry");
    b.define(entry).inst(mark("seen")).term(Term::Unreachable);
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    let mut analyzer: Analyzer<'_, PathDom> = Analyzer::new(&pgm, ExecOpts::default());
    analyzer.exec_pgm().unwrap();
    assert_eq!(hits("seen"), 1);
}
