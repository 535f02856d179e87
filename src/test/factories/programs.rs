use crate::ir::Program;

/// `main` calls `foo()` twice; `bar(int)` is defined.
pub const TWO_FOO_CALLS: &str = r#"
define void @_Z3foov() {
entry:
  ret void
}

define void @_Z3bari(i32 %I) {
entry:
  %r = add i32 %I, 1
  ret void
}

define i32 @main(i32 %argc, ptr %argv) {
entry:
  call void @_Z3foov(), !dbg !0
  call void @_Z3foov(), !dbg !1
  %c = icmp sgt i32 %argc, 1
  br i1 %c, label %more, label %done
more:
  %n = add i32 %argc, 2
  br label %done
done:
  ret i32 0
}

!0 = !DILocation(line: 12, column: 3)
!1 = !DILocation(line: 13, column: 3)
"#;

/// `foo()` and `bar(int)` exist but nothing calls `foo()`.
pub const NO_FOO_CALLS: &str = r#"
declare void @_Z3foov()
declare void @_Z3bari(i32)

define i32 @main() {
entry:
  call void @_Z3bari(i32 7)
  ret i32 0
}
"#;

/// `main` calls `foo()` once directly and once through a pointer.
pub const INDIRECT_FOO_CALL: &str = r#"
declare void @_Z3foov()
declare void @_Z3bari(i32)

define i32 @main() {
entry:
  %slot = alloca ptr
  store ptr @_Z3foov, ptr %slot
  %fp = load ptr, ptr %slot
  call void %fp()
  call void @_Z3foov()
  ret i32 0
}
"#;

/// `foo()` is called once and `foo(int)` twice.
pub const OVERLOADED_FOO: &str = r#"
declare void @_Z3foov()
declare void @_Z3fooi(i32)

define i32 @main() {
entry:
  call void @_Z3fooi(i32 1)
  call void @_Z3foov()
  call void @_Z3fooi(i32 2)
  ret i32 0
}
"#;

/// `main` calls `foo()` but `bar(int)` does not exist.
pub const MISSING_BAR: &str = r#"
declare void @_Z3foov()
declare void @_Z3bazi(i32)

define i32 @main() {
entry:
  call void @_Z3foov()
  ret i32 0
}
"#;

/// `foo()` returns `i32` while `bar(int)` returns `void`.
pub const VALUED_FOO_CALLS: &str = r#"
declare i32 @_Z3foov()
declare void @_Z3bari(i32)

define i32 @main() {
entry:
  %a = call i32 @_Z3foov()
  %b = call i32 @_Z3foov()
  ret i32 0
}
"#;

fn parse(source: &str) -> Program {
    Program::from_source(source).unwrap()
}

pub fn two_foo_calls() -> Program {
    parse(TWO_FOO_CALLS)
}

pub fn no_foo_calls() -> Program {
    parse(NO_FOO_CALLS)
}

pub fn indirect_foo_call() -> Program {
    parse(INDIRECT_FOO_CALL)
}

pub fn overloaded_foo() -> Program {
    parse(OVERLOADED_FOO)
}

pub fn missing_bar() -> Program {
    parse(MISSING_BAR)
}

pub fn valued_foo_calls() -> Program {
    parse(VALUED_FOO_CALLS)
}
