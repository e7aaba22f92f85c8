use log::info;

use subcrack_core::io::{filter_to_alphabet, read_text};
use subcrack_core::sampler::ensemble::{best_of, run_restarts};
use subcrack_core::sampler::observer::{CancelToken, LogObserver};
use subcrack_core::sampler::chain_rng;
use subcrack_core::{Alphabet, Key, MetropolisSampler, NGramModel, SamplerConfig, StartKey};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=info shows the snapshots, RUST_LOG=debug the model and run summaries
    env_logger::init();

    // Letters a-z and the space
    let alphabet = Alphabet::lowercase_latin();

    // Build the bigram model from the reference corpus
    // Load automatically data/corpus.2gram.bin if existing
    let model = NGramModel::load_or_build("./data/corpus.txt", &alphabet, 2)?;

    // Encrypt the message with a random key so there is something to break
    let message = filter_to_alphabet(&read_text("./data/message.txt")?, &alphabet, true);
    let secret = Key::random(alphabet.len(), &mut chain_rng(0xC0FFEE));
    let ciphertext = secret.apply_str(&alphabet, &message)?;
    println!("Ciphertext: {}", ciphertext);

    let mut config = SamplerConfig::default();

    // Number of propose/score/accept steps per chain
    config.iters = 20_000;

    // A snapshot every 'eval_every' iterations
    config.set_eval_every(2_000)?;

    // Swapping 2 symbols per proposal is the usual choice
    config.set_swap_size(2)?;

    // Start each chain from the best of 500 random keys
    config.start_key = StartKey::WarmStart(500);

    // Invalid values are refused
    match config.set_swap_size(1) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Swap size 1 is invalid: {}", e),
    }

    // The reference plaintext only feeds the Hamming-distance trace
    let sampler = MetropolisSampler::new(&model, &ciphertext, config)?.with_reference(&message)?;

    // One chain with progress reported through the logger
    let outcome = sampler.run_with(&mut chain_rng(1), &mut LogObserver, None)?;
    println!("Single chain score: {:.3}", outcome.score);
    println!("Single chain message: {}", outcome.decoded);
    if let Some(trace) = outcome.hamming() {
        println!("Hamming distances: {:?}", trace);
    }

    // Independent restarts on every core, keep the best final score
    let seeds: Vec<u64> = (1..=8).collect();
    let outcomes = run_restarts(&sampler, &seeds, Some(&CancelToken::new()))?;
    let best = match best_of(&outcomes) {
        Some(best) => best,
        None => return Err("No chain finished".into()),
    };
    info!("best acceptance rate {:.3}", best.acceptance_rate());

    println!("Best score: {:.3}", best.score);
    println!("Decrypted: {}", best.decoded);
    println!("Recovered key: {}", best.key.images_str(&alphabet)?);
    println!("Secret key:    {}", secret.invert().images_str(&alphabet)?);
    for (from, to) in best.key.mapping(&alphabet)? {
        print!("{}->{} ", from, to);
    }
    println!();

    Ok(())
}
