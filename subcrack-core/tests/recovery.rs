use std::collections::HashSet;

use subcrack_core::io::filter_to_alphabet;
use subcrack_core::model::score::hamming_distance;
use subcrack_core::sampler::chain_rng;
use subcrack_core::sampler::ensemble::{best_of, run_restarts};
use subcrack_core::{Alphabet, Key, MetropolisSampler, NGramModel, SamplerConfig, Scorer, StartKey};

const CORPUS: &str = "he had a bad cab and a deaf hag fed a bee a cabbage head \
	a bee faced a hedge and the hag had a bag of beef \
	dad bagged a big egg each faded badge had a cage ";

const PLAINTEXT: &str = "a deaf hag had a bad cab and fed a bee a big cabbage head";

fn all_keys(len: usize) -> Vec<Key> {
	fn permute(prefix: &mut Vec<usize>, left: &mut Vec<usize>, out: &mut Vec<Key>) {
		if left.is_empty() {
			out.push(Key::from_images(prefix.clone()).unwrap());
			return;
		}
		for i in 0..left.len() {
			let symbol = left.remove(i);
			prefix.push(symbol);
			permute(prefix, left, out);
			prefix.pop();
			left.insert(i, symbol);
		}
	}
	let mut out = Vec::new();
	permute(&mut Vec::new(), &mut (0..len).collect(), &mut out);
	out
}

fn three_symbol_sampler<'a>(model: &'a NGramModel, swap_size: usize) -> MetropolisSampler<'a, NGramModel> {
	let alphabet = model.alphabet();
	let k0 = Key::from_partial(alphabet, "abc", "bca").unwrap();
	let ciphertext = k0.apply_str(alphabet, "abcabc").unwrap();
	assert_eq!(ciphertext, "bcabca");

	// Deliberately wrong start: the reversed cycle.
	let start = Key::from_partial(alphabet, "abc", "cba").unwrap();
	let mut config = SamplerConfig::default();
	config.iters = 2000;
	config.set_eval_every(10).unwrap();
	config.set_swap_size(swap_size).unwrap();
	config.start_key = StartKey::Custom(start);

	MetropolisSampler::new(model, &ciphertext, config)
		.unwrap()
		.with_reference("abcabc")
		.unwrap()
}

#[test]
fn three_symbol_bigram_scenario() {
	let alphabet = Alphabet::new("abc").unwrap();
	let model = NGramModel::from_text("aabcabcabcabc", &alphabet, 2).unwrap();
	let outcome = three_symbol_sampler(&model, 2).run(&mut chain_rng(2024)).unwrap();

	// The corpus cannot tell rotations of "abc" apart, so the chain settles
	// among the three decodings that keep the pattern of the plaintext.
	let rotations: HashSet<&str> = ["abcabc", "bcabca", "cabcab"].into_iter().collect();
	let samples = outcome.trajectory.snapshots();
	let in_class = samples.iter().filter(|s| rotations.contains(s.sample.as_str())).count();
	assert_eq!(samples.len(), 200);
	assert!(in_class * 10 >= samples.len() * 9);

	// A rotation matches the reference everywhere or nowhere.
	let trace = outcome.hamming().unwrap();
	assert_eq!(trace.len(), samples.len());
	let exact_or_rotated = trace.iter().filter(|d| **d == 0 || **d == 6).count();
	assert!(exact_or_rotated * 10 >= trace.len() * 9);
}

#[test]
fn three_symbol_scenario_reaches_the_optimum() {
	let alphabet = Alphabet::new("abc").unwrap();
	let model = NGramModel::from_text("aabcabcabcabc", &alphabet, 2).unwrap();
	let sampler = three_symbol_sampler(&model, 3);
	let outcome = sampler.run(&mut chain_rng(2024)).unwrap();

	let optimum = all_keys(3)
		.iter()
		.map(|k| model.score(&k.decode(sampler.ciphertext()).unwrap()))
		.fold(f64::NEG_INFINITY, f64::max);
	assert_eq!(outcome.best_score, optimum);
	// This corpus likes the ciphertext best read as is.
	assert_eq!(outcome.best_key, Key::identity(3));
	assert!(outcome.hamming().unwrap().contains(&0));
}

#[test]
fn ensemble_recovers_plaintext() {
	let alphabet = Alphabet::new("abcdefgh ").unwrap();
	let corpus = filter_to_alphabet(&CORPUS.repeat(3), &alphabet, true);
	let model = NGramModel::from_text(&corpus, &alphabet, 2).unwrap();

	let plaintext = format!(
		"{} {}",
		filter_to_alphabet(PLAINTEXT, &alphabet, true),
		filter_to_alphabet(CORPUS, &alphabet, true)
	);
	let encryption = Key::from_partial(&alphabet, "abcdefgh ", "hg fedcba").unwrap();
	let ciphertext = encryption.apply_str(&alphabet, &plaintext).unwrap();

	let mut config = SamplerConfig::default();
	config.iters = 2001;
	config.set_eval_every(500).unwrap();
	let sampler = MetropolisSampler::new(&model, &ciphertext, config)
		.unwrap()
		.with_reference(&plaintext)
		.unwrap();

	let seeds: Vec<u64> = (1..=16).collect();
	let outcomes = run_restarts(&sampler, &seeds, None).unwrap();
	let best = best_of(&outcomes).unwrap();

	assert_eq!(best.decoded, plaintext);
	assert_eq!(best.key, encryption.invert());
	assert_eq!(best.hamming().unwrap().last(), Some(&0));
	assert_eq!(
		hamming_distance(&alphabet.encode(&best.decoded).unwrap(), &alphabet.encode(&plaintext).unwrap()).unwrap(),
		0
	);

	let mapping = best.key.mapping(&alphabet).unwrap();
	assert_eq!(mapping[&'h'], 'a');
	assert_eq!(mapping[&' '], 'c');
}

#[test]
fn repeated_runs_are_identical() {
	let alphabet = Alphabet::new("abcdefgh ").unwrap();
	let model = NGramModel::from_text(&filter_to_alphabet(CORPUS, &alphabet, true), &alphabet, 2).unwrap();
	let ciphertext = Key::from_partial(&alphabet, "abcdefgh ", "bcdefgh a")
		.unwrap()
		.apply_str(&alphabet, &filter_to_alphabet(PLAINTEXT, &alphabet, true))
		.unwrap();

	let mut config = SamplerConfig::default();
	config.iters = 1500;
	config.start_key = StartKey::WarmStart(50);
	let sampler = MetropolisSampler::new(&model, &ciphertext, config).unwrap();

	let first = sampler.run(&mut chain_rng(77)).unwrap();
	let second = sampler.run(&mut chain_rng(77)).unwrap();
	assert_eq!(first.key, second.key);
	assert_eq!(first.best_key, second.best_key);
	assert_eq!(first.accepted_scores, second.accepted_scores);
	assert_eq!(first.trajectory, second.trajectory);
}
