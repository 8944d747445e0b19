#[cfg(test)]
mod tests {
	use std::{fs::read_to_string, path::PathBuf};

	use zangel::{Engine, EngineConfig, builtins::Output};

	fn script(name: &str) -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts").join(name) }

	#[test]
	fn test_script_file() {
		let mut engine = Engine::new(EngineConfig::default()).unwrap();
		let result = engine.run_file(script("primes.as"), "main");
		assert!(result.is_ok());
	}

	#[test]
	fn script_output() {
		let output = Output::capture();
		let mut engine = Engine::with_output(EngineConfig::default(), output.clone()).unwrap();
		let source = read_to_string(script("primes.as")).unwrap();
		let module = engine.build("primes.as", &source).unwrap();
		let found = engine.execute(&module, "main", Vec::new()).unwrap();
		assert_eq!(found.as_int(), Some(10));
		assert_eq!(output.captured(), "small small small small medium medium medium medium large large \n");
	}

	#[test]
	fn missing_entry_point() {
		let mut engine = Engine::new(EngineConfig::default()).unwrap();
		assert!(engine.run_file(script("primes.as"), "start").is_err());
		assert!(engine.run_file(script("missing.as"), "main").is_err());
	}
}
