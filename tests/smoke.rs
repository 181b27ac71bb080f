//! End-to-end smoke test through the facade: build a program, analyze it
//! with the stock domain, observe a finding.

use sift::prelude::*;

#[test]
fn use_before_definition_is_reported() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let exit = b.block("exit");
    b.define(entry)
        .inst(Inst::load("x", Exp::var("never_defined")))
        .term(Term::goto(exit));
    b.define(exit).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    #[derive(Default)]
    struct Count(usize);
    impl<D: Domain> Reporter<D> for Count {
        fn invalid_access_inst(&mut self, _: &D, _: &Inst, _: Block) {
            self.0 += 1;
        }
        fn invalid_access_term(&mut self, _: &D, _: &Term, _: Block) {}
        fn unknown_call(&mut self, _: &Term, _: Block) {}
    }

    let mut analyzer =
        Analyzer::<'_, VSet>::new(&pgm, ExecOpts::default()).with_reporter(Count::default());
    analyzer.exec_pgm().unwrap();
    assert_eq!(analyzer.reporter().0, 1);
}
