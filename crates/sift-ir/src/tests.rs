use crate::{Call, Exp, Inst, Jump, Program, Term};

fn call(callee: &str, retn: crate::Block) -> Term {
    Term::Call(Call {
        callee: Exp::Func(callee.into()),
        args: Vec::new(),
        areturn: None,
        retn: Jump::to(retn),
        throw: None,
        recursive: false,
    })
}

#[test]
fn sort_index_follows_reverse_postorder() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let head = b.block("head");
    let body = b.block("body");
    let exit = b.block("exit");
    b.define(entry).term(Term::goto(head));
    b.define(head).term(Term::Switch {
        key: Exp::var("k"),
        tbl: vec![(Exp::Int(1), Jump::to(body))],
        els: Jump::to(exit),
    });
    b.define(body)
        .inst(Inst::nondet(None, "spin"))
        .term(Term::goto(head));
    b.define(exit).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    assert_eq!(pgm.block(entry).sort_index, 0);
    assert_eq!(pgm.block(head).sort_index, 1);
    assert_eq!(pgm.block(body).sort_index, 2);
    assert_eq!(pgm.block(exit).sort_index, 3);
    let main = pgm.func(&"main".into()).unwrap();
    assert_eq!(main.blocks, vec![entry, head, body, exit]);
}

#[test]
fn loop_back_edge_is_retreating() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let head = b.block("head");
    let body = b.block("body");
    let exit = b.block("exit");
    b.define(entry).term(Term::goto(head));
    b.define(head).term(Term::Switch {
        key: Exp::var("k"),
        tbl: vec![(Exp::Int(1), Jump::to(body))],
        els: Jump::to(exit),
    });
    b.define(body).term(Term::goto(head));
    b.define(exit).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    // The only retreating edge is body -> head.
    let retreating: Vec<_> = pgm
        .func(&"main".into())
        .unwrap()
        .blocks
        .iter()
        .flat_map(|&blk| {
            pgm.block(blk)
                .term
                .jumps()
                .filter(|j| j.retreating)
                .map(move |j| (blk, j.dst))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(retreating, vec![(body, head)]);
}

#[test]
fn mutual_recursion_is_marked() {
    let mut b = Program::builder();
    let f_entry = b.block("f.entry");
    let f_ret = b.block("f.ret");
    let g_entry = b.block("g.entry");
    let g_ret = b.block("g.ret");
    let h_entry = b.block("h.entry");
    let h_ret = b.block("h.ret");
    b.define(f_entry).term(call("g", f_ret));
    b.define(f_ret).term(Term::Return { exp: None });
    b.define(g_entry).term(call("f", g_ret));
    b.define(g_ret).term(Term::Return { exp: None });
    b.define(h_entry).term(call("f", h_ret));
    b.define(h_ret).term(Term::Return { exp: None });
    b.func().name("f").entry(f_entry).new().unwrap();
    b.func().name("g").entry(g_entry).new().unwrap();
    b.func().name("h").entry(h_entry).new().unwrap();
    let pgm = b.finish().unwrap();

    let recursive = |blk| match &pgm.block(blk).term {
        Term::Call(c) => c.recursive,
        _ => unreachable!(),
    };
    assert!(recursive(f_entry));
    assert!(recursive(g_entry));
    assert!(!recursive(h_entry));
}

#[test]
fn self_recursion_is_marked() {
    let mut b = Program::builder();
    let entry = b.block("r.entry");
    let ret = b.block("r.ret");
    b.define(entry).term(call("r", ret));
    b.define(ret).term(Term::Return { exp: None });
    b.func().name("r").entry(entry).new().unwrap();
    let pgm = b.finish().unwrap();

    match &pgm.block(entry).term {
        Term::Call(c) => assert!(c.recursive),
        _ => unreachable!(),
    }
}

#[test]
fn undefined_block_is_rejected() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    b.func().name("main").entry(entry).new().unwrap();
    assert!(matches!(
        b.finish(),
        Err(crate::BuildError::UndefinedBlock { .. })
    ));
}

#[test]
fn unreached_block_is_rejected() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    let orphan = b.block("orphan");
    b.define(entry).term(Term::Return { exp: None });
    b.define(orphan).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    assert!(matches!(
        b.finish(),
        Err(crate::BuildError::UnreachedBlock { .. })
    ));
}

#[test]
fn block_shared_between_functions_is_rejected() {
    let mut b = Program::builder();
    let f_entry = b.block("f.entry");
    let shared = b.block("shared");
    let g_entry = b.block("g.entry");
    b.define(f_entry).term(Term::goto(shared));
    b.define(shared).term(Term::Return { exp: None });
    b.define(g_entry).term(Term::goto(shared));
    b.func().name("f").entry(f_entry).new().unwrap();
    b.func().name("g").entry(g_entry).new().unwrap();
    assert!(matches!(
        b.finish(),
        Err(crate::BuildError::SharedBlock { .. })
    ));
}

#[test]
fn duplicate_function_is_rejected() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    b.define(entry).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    assert!(matches!(
        b.func().name("main").new(),
        Err(crate::BuildError::DuplicateFunction(_))
    ));
}

#[test]
fn undefined_function_has_no_blocks() {
    let mut b = Program::builder();
    let entry = b.block("entry");
    b.define(entry).term(Term::Return { exp: None });
    b.func().name("main").entry(entry).new().unwrap();
    b.func().name("ext").new().unwrap();
    let pgm = b.finish().unwrap();

    let ext = pgm.func(&"ext".into()).unwrap();
    assert!(!ext.is_defined());
    assert!(ext.blocks.is_empty());
}
