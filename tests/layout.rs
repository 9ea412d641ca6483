//! Integration tests for bytecode layout, re-routing and encoding.

use dotdex::prelude::*;

fn v(index: u16) -> Register {
    Register::new(index)
}

/// nop, goto, packed-switch with three targets: 5 instruction units plus a 10 unit payload.
#[test]
fn test_code_unit_accounting() -> Result<()> {
    let mut body = MethodBody::new(1);
    let nop = body.push(OpCode::Nop, vec![], Operand::None)?;
    let goto = body.push(OpCode::Goto, vec![], Operand::Target(nop))?;
    let switch = body.push(
        OpCode::PackedSwitch,
        vec![v(0)],
        Operand::PackedSwitch(PackedSwitchData::new(0, vec![nop, goto, nop])),
    )?;

    let stats = body.update_instruction_offsets()?;
    assert_eq!(stats.code_units, 5);
    assert_eq!(stats.extra_code_units, 10);
    assert_eq!(stats.total(), 15);
    assert_eq!(body.state(), BodyState::Finalized);
    assert_eq!(body.offset_of(switch)?, 2);

    // The payload origin is rounded up to an even offset
    assert_eq!(stats.payload_start(), 6);
    assert_eq!(stats.encoded_units(), 16);

    let codes = InstructionWriter::new(&IndexPool::new()).write(&mut body)?;
    assert_eq!(
        codes,
        vec![
            0x0000, // nop
            0xff28, // goto -1
            0x002b, 0x0004, 0x0000, // packed-switch v0, +4
            0x0000, // alignment pad
            0x0100, 0x0003, 0x0000, 0x0000, // ident, size, first key
            0xfffe, 0xffff, 0xffff, 0xffff, 0xfffe, 0xffff,
        ]
    );
    assert_eq!(body.state(), BodyState::Serialized);
    Ok(())
}

/// Replacing the last protected instruction retargets the branch but shrinks the try range.
#[test]
fn test_reroute_then_remove() -> Result<()> {
    let mut body = MethodBody::new(1);
    let c = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
    let a = body.insert_before(c, OpCode::IfEqz, vec![v(0)], Operand::Target(c))?;
    let b = body.insert_before(c, OpCode::Nop, vec![], Operand::None)?;
    body.add_handler(ExceptionHandler::new(a, c))?;
    let c_prime = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;

    BranchReRouter::new(&mut body).reroute(c, c_prime)?;
    assert_eq!(body.instruction(a).unwrap().operand().targets(), vec![c_prime]);
    assert_eq!(body.handlers()[0].try_start, a);
    assert_eq!(body.handlers()[0].try_end, b);

    body.remove(c)?;
    body.validate()?;

    let codes = InstructionWriter::new(&IndexPool::new()).write(&mut body)?;
    assert_eq!(codes, vec![0x0038, 0x0003, 0x0000, 0x000e]);
    Ok(())
}

/// Removing an instruction that is still referenced is caught before encoding.
#[test]
fn test_dangling_target_is_structural() -> Result<()> {
    let mut body = MethodBody::new(1);
    let ret = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
    let branch = body.insert_before(ret, OpCode::Goto, vec![], Operand::Target(ret))?;
    body.remove(ret)?;
    body.push(OpCode::ReturnVoid, vec![], Operand::None)?;

    match InstructionWriter::new(&IndexPool::new()).write(&mut body) {
        Err(Error::Structural { instruction, .. }) => assert_eq!(instruction.id(), branch),
        other => panic!("expected a structural error, got {other:?}"),
    }
    assert_ne!(body.state(), BodyState::Serialized);
    Ok(())
}

/// Object creation and a virtual call, indexed through a shared pool.
#[test]
fn test_encode_with_pool() -> Result<()> {
    let void = TypeReference::primitive(PrimitiveKind::Void);
    let builder = TypeReference::foreign_class("java/lang/StringBuilder");
    let init = MethodReference::new(builder.clone(), "<init>", vec![], void.clone());
    let append = MethodReference::new(
        builder.clone(),
        "append",
        vec![TypeReference::foreign_class("java/lang/String")],
        builder.clone(),
    );

    let mut body = MethodBody::new(2);
    body.push(OpCode::NewInstance, vec![v(0)], Operand::Type(builder))?;
    body.push(OpCode::InvokeDirect, vec![v(0)], Operand::Method(init))?;
    body.push(OpCode::ConstString, vec![v(1)], Operand::String("dex".into()))?;
    body.push(OpCode::InvokeVirtual, vec![v(0), v(1)], Operand::Method(append))?;
    body.push(OpCode::ReturnVoid, vec![], Operand::None)?;

    let pool = IndexPool::new();
    pool.collect(&body);
    assert_eq!(pool.type_count(), 1);
    assert_eq!(pool.method_count(), 2);
    assert_eq!(pool.string_count(), 1);

    let codes = InstructionWriter::new(&pool).write(&mut body)?;
    assert_eq!(
        codes,
        vec![
            0x0022, 0x0000, // new-instance v0, type@0
            0x1070, 0x0000, 0x0000, // invoke-direct {v0}, method@0
            0x011a, 0x0000, // const-string v1, string@0
            0x206e, 0x0001, 0x0010, // invoke-virtual {v0, v1}, method@1
            0x000e,
        ]
    );
    Ok(())
}

/// Editing a finalized body invalidates its offsets until the next layout.
#[test]
fn test_edit_invalidates_layout() -> Result<()> {
    let mut body = MethodBody::new(1);
    let ret = body.push(OpCode::ReturnVoid, vec![], Operand::None)?;
    body.update_instruction_offsets()?;
    assert_eq!(body.offset_of(ret)?, 0);

    body.insert_before(ret, OpCode::Const16, vec![v(0)], Operand::Literal(-2))?;
    assert_eq!(body.state(), BodyState::Populated);
    assert!(matches!(body.offset_of(ret), Err(Error::InvalidState { .. })));

    body.update_instruction_offsets()?;
    assert_eq!(body.offset_of(ret)?, 2);
    Ok(())
}
