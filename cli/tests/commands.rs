use std::path::{Path, PathBuf};

use clap::Parser;
use srmc::{Cli, exit_code, handle};
use srmc_core::prelude::*;
use srmc_core::srmc_tflite::writer::ModelWriter;
use srmc_core::srmc_tflite::{BuiltinOperator, ElementType};

/// Answers like Vela would, with a fixed footprint given in KiB.
struct Vela {
    cycles: u64,
    weights_kib: f64,
    arena_kib: f64,
}

impl Default for Vela {
    fn default() -> Vela {
        Vela { cycles: 1000, weights_kib: 100.0, arena_kib: 100.0 }
    }
}

impl ToolRunner for Vela {
    fn run(&self, _program: &str, args: &[String]) -> SrmcResult<ToolOutput> {
        if args == ["--version"] {
            return Ok(ToolOutput { status: Some(0), stdout: "4.3.0\n".into(), ..ToolOutput::default() });
        }
        let out_dir = Path::new(&args[1]);
        let model = Path::new(args.last().unwrap());
        let stem = model.file_stem().unwrap().to_string_lossy();
        let config = args.iter().find_map(|a| a.strip_prefix("--system-config=")).unwrap();
        let csv = format!(
            "core_clock,cycles_npu,inferences_per_second,inference_time,off_chip_flash_memory_used,sram_memory_used,arena_cache_size\n\
             400000000.0,{},1000.0,0.001,{},{},{}\n",
            self.cycles, self.weights_kib, self.arena_kib, self.arena_kib
        );
        std::fs::write(out_dir.join(format!("{stem}_summary_{config}.csv")), csv)?;
        std::fs::copy(model, out_dir.join(format!("{stem}_vela.tflite")))?;
        Ok(ToolOutput { status: Some(0), stdout: format!("compiled {stem}"), ..ToolOutput::default() })
    }
}

fn model(dir: &Path, name: &str, ops: &[BuiltinOperator]) -> PathBuf {
    let mut writer = ModelWriter::default()
        .input("audio", ElementType::I8, &[1, 4])
        .output("scores", ElementType::I8, &[1, 2]);
    for op in ops {
        writer = writer.builtin(*op);
    }
    let path = dir.join(name);
    std::fs::write(&path, writer.write()).unwrap();
    path
}

fn kws(dir: &Path) -> PathBuf {
    model(dir, "kws.tflite", &[BuiltinOperator::CONV_2D, BuiltinOperator::SOFTMAX])
}

fn srmc(vela: Vela, args: &[&str]) -> (i32, String) {
    let cli = Cli::try_parse_from(std::iter::once("srmc").chain(args.iter().copied())).unwrap();
    let mut out = vec![];
    let outcome = handle(&cli, vela, &mut out);
    (exit_code(&outcome), String::from_utf8(out).unwrap())
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn compile_writes_sources() {
    let dir = tempfile::tempdir().unwrap();
    let model = kws(dir.path());
    let out = dir.path().join("out");
    let (code, stdout) =
        srmc(Vela::default(), &["compile", "-m", s(&model), "-o", s(&out), "--model-namespace", "kws"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("fits on sr100_npu_400MHz_all_vmem"));
    assert!(stdout.contains("   vmem_size = 204800"));
    assert!(out.join("model.cc").exists());
    assert!(out.join("kws_micro_mutable_op_resolver.hpp").exists());
    assert!(out.join("kws.bin").exists());
}

#[test]
fn json_report() {
    let dir = tempfile::tempdir().unwrap();
    let model = kws(dir.path());
    let (code, stdout) = srmc(Vela::default(), &["compile", "-m", s(&model), "--json"]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["fits"], true);
    assert_eq!(report["model_loc"], "vmem");
    assert_eq!(report["cycles_npu"], 1000);
}

#[test]
fn too_large_model_exits_1_with_report() {
    let dir = tempfile::tempdir().unwrap();
    let model = kws(dir.path());
    let (code, stdout) =
        srmc(Vela::default(), &["compile", "-m", s(&model), "--vmem-size-limit", "1000"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("does not fit"));
    assert!(stdout.contains("   vmem_size_limit = 1000"));
}

#[test]
fn unmapped_model_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let model = kws(dir.path());
    let (code, stdout) = srmc(Vela { cycles: 0, ..Vela::default() }, &["compile", "-m", s(&model)]);
    assert_eq!(code, 1);
    assert!(stdout.contains("could not be mapped"));
}

#[test]
fn malformed_model_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("broken.tflite");
    std::fs::write(&model, b"garbage").unwrap();
    assert_eq!(srmc(Vela::default(), &["compile", "-m", s(&model)]).0, 2);
    assert_eq!(srmc(Vela::default(), &["optimize", "-m", s(&model)]).0, 2);
    assert_eq!(srmc(Vela::default(), &["resolver", s(&model)]).0, 2);
}

#[test]
fn unsupported_operators_exit_3() {
    let dir = tempfile::tempdir().unwrap();
    let model = kws(dir.path());
    let header = dir.path().join("micro_mutable_op_resolver.h");
    std::fs::write(&header, "  TfLiteStatus AddConv2D(const TFLMRegistration& r = Register_CONV_2D());\n").unwrap();
    let out = dir.path().join("out");
    let (code, _) =
        srmc(Vela::default(), &["resolver", s(&model), "-o", s(&out), "--verify-against", s(&header)]);
    assert_eq!(code, 3);
    assert!(!out.join("model_micro_mutable_op_resolver.hpp").exists());
    let (code, stdout) = srmc(
        Vela::default(),
        &["compile", "-m", s(&model), "-o", s(&out), "--verify-against", s(&header)],
    );
    assert_eq!(code, 3);
    assert!(stdout.contains("fits on sr100_npu_400MHz_all_vmem"));
    assert!(stdout.contains("   vmem_size = 204800"));
    assert!(!out.join("model.cc").exists());
}

#[test]
fn resolver_merges_models() {
    let dir = tempfile::tempdir().unwrap();
    kws(dir.path());
    model(dir.path(), "vad.tflite", &[BuiltinOperator::FULLY_CONNECTED, BuiltinOperator::SOFTMAX]);
    let out = dir.path().join("out");
    let pattern = dir.path().join("*.tflite");
    let (code, stdout) = srmc(Vela::default(), &["resolver", s(&pattern), "-o", s(&out), "--namespace", "app"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["AddConv2D", "AddFullyConnected", "AddSoftmax"]);
    let header = std::fs::read_to_string(out.join("app_micro_mutable_op_resolver.hpp")).unwrap();
    assert!(header.contains("MicroMutableOpResolver<3>"));
    assert!(header.contains("kws.tflite, vad.tflite"));
}

#[test]
fn optimize_then_generate() {
    let dir = tempfile::tempdir().unwrap();
    let model = kws(dir.path());
    let out = dir.path().join("out");
    let (code, stdout) = srmc(Vela::default(), &["optimize", "-m", s(&model), "-o", s(&out)]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Weights in vmem"));
    let source = std::fs::read_to_string(out.join("model.cc")).unwrap();
    assert!(source.contains("arena_cache_size = 102400;"));
}

#[test]
fn modes_and_version() {
    let (code, stdout) = srmc(Vela::default(), &["modes"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("sr100_npu_400MHz_tensor_vmem_weights_lpmem"));
    assert!(stdout.contains("default memory mode Shared_Sram"));
    assert!(stdout.contains("   Dedicated_Sram"));
    assert_eq!(srmc(Vela::default(), &["tool-version"]), (0, "4.3.0\n".to_string()));
}
