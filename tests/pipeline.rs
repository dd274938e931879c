//! Whole-pipeline runs through the driver.
use isaflow::driver;
use isaflow::ir::{
    self, Builder, BuiltIn, Constant, Definition, Graph, Kind, NodeKind, Param,
    Type,
};

const BYTE: Type = Type::UInt(8);
const HALF: Type = Type::UInt(16);

/// `twice(x: UInt<8>) -> UInt<16> = (x as UInt<16>) + (x as UInt<16>)`
fn twice() -> Definition {
    let mut g = Graph::new("twice");
    let mut b = Builder::new(&mut g);
    let x = b.param("x", BYTE).unwrap();
    let wide = b.cast(x, HALF).unwrap();
    let sum = b.builtin(BuiltIn::Add, &[wide, wide]).unwrap();
    let ret = b.ret(sum).unwrap();
    b.straight_line(ret).unwrap();
    Definition::function("twice", vec![Param::new("x", BYTE)], HALF, g)
}

/// `A := A + twice(3)`
fn bump() -> Definition {
    let mut g = Graph::new("BUMP");
    let mut b = Builder::new(&mut g);
    let a = b.read_reg("A", HALF).unwrap();
    let three = b.constant(3, BYTE).unwrap();
    let six = b.call("twice", &[three], HALF).unwrap();
    let sum = b.builtin(BuiltIn::Add, &[a, six]).unwrap();
    let write = b.write_reg("A", sum, None).unwrap();
    let end = b.instr_end(&[write]).unwrap();
    b.straight_line(end).unwrap();
    Definition::instruction("BUMP", g)
}

fn context() -> ir::Context {
    ir::Context::new(vec![bump(), twice()])
}

fn constant(g: &Graph, id: Option<ir::NodeId>) -> Option<Constant> {
    match g.kind(id?) {
        NodeKind::Const(c) => Some(c.value),
        _ => None,
    }
}

#[test]
fn all_passes_simplify_calls_to_constants() {
    let mut ctx = context();
    driver::run_compiler("isaflow", &["--log", "warn"], &mut ctx).unwrap();

    let bump = ctx.find("BUMP".into()).unwrap();
    let g = &bump.behavior;
    assert_eq!(g.nodes_of(Kind::FuncCall).count(), 0);
    assert_eq!(g.nodes_of(Kind::TypeCast).count(), 0);
    // Start, InstrEnd, WriteReg, ReadReg, the addition and its constant.
    assert_eq!(g.len(), 6, "{}", ir::Printer::graph_to_string(g));

    let write = g.single_node_of(Kind::WriteReg).unwrap();
    let sum = g.inputs(write)[0].unwrap();
    let args = g.inputs(sum);
    assert_eq!(g.kind(args[0].unwrap()).kind(), Kind::ReadReg);
    assert_eq!(constant(g, args[1]), Some(Constant::new(6, HALF)));

    // The callee lost its cast but is otherwise unchanged.
    let twice = ctx.find("twice".into()).unwrap();
    assert_eq!(twice.behavior.nodes_of(Kind::TypeCast).count(), 0);
    assert_eq!(twice.behavior.nodes_of(Kind::ZeroExtend).count(), 1);
    assert!(!twice.verify().has_errors());
}

#[test]
fn disabled_passes_and_pass_options_are_honored() {
    let mut ctx = context();
    driver::run_compiler(
        "isaflow",
        &[
            "-p",
            "pre-opt",
            "-d",
            "dead-node-removal",
            "-x",
            "function-inliner:max-nodes=3",
        ],
        &mut ctx,
    )
    .unwrap();
    assert_eq!(
        ctx.extra_opts,
        vec!["function-inliner:max-nodes=3".to_string()]
    );

    // `twice` has five nodes, so the call stays.
    let bump = ctx.find("BUMP".into()).unwrap();
    let g = &bump.behavior;
    assert_eq!(g.nodes_of(Kind::FuncCall).count(), 1);
    let call = g.single_node_of(Kind::FuncCall).unwrap();
    assert_eq!(constant(g, g.inputs(call)[0]), Some(Constant::new(3, BYTE)));
}

#[test]
fn verification_failures_abort_the_pipeline() {
    let mut orphan = Graph::new("ORPHAN");
    let mut b = Builder::new(&mut orphan);
    let v = b.read_reg("A", BYTE).unwrap();
    b.write_reg("B", v, None).unwrap();
    // `twice` is missing as well.
    let mut ctx = ir::Context::new(vec![
        Definition::instruction("ORPHAN", orphan),
        bump(),
    ]);

    let err = driver::run_compiler("isaflow", &["-p", "all"], &mut ctx)
        .unwrap_err();
    let msg = err.message();
    assert!(msg.contains("missing InstrEnd node"), "{msg}");
    assert!(msg.contains("Undefined function name: twice"), "{msg}");
    // Nothing ran after the failed validation.
    let bump = ctx.find("BUMP".into()).unwrap();
    assert_eq!(bump.behavior.nodes_of(Kind::FuncCall).count(), 1);
}

#[test]
fn unknown_passes_are_rejected() {
    let mut ctx = context();
    let err = driver::run_compiler("isaflow", &["-p", "no-such-pass"], &mut ctx)
        .unwrap_err();
    assert!(err.message().contains("Unknown pass: no-such-pass"));
}
