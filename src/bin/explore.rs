
use core::panic;
use std::{
    collections::HashMap,
    env,
    fs::File,
    io::{self, BufRead},
};

use ndarray::Array2;
use skipgram_trainer::{files_handling, Result, Similarity};

// this binary has some checks on trained vectors, functionality to get
// the K most similar words to a given word,
// the K most similar words to a combination of words (analogies),
// and the odd one out of a group of words.
// treated as a binary executable so it can be ran independently from main

fn main() {
    // arguments to this executable should be:
    // a letter selector: "a" for analogies, "b" for word similarity, "c" for odd-one-out
    // path to input based on selector (quads, singles or groups)
    // path to trained vecs (npy, without extension)
    // path to tokens (json, without extension)
    // example: ... a Input/analogies.txt Output/vecs Output/words
    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        panic!("expected: selector (a|b|c), input file, path to vecs, path to words");
    }
    let selector = &args[1];
    if !["a", "b", "c"].contains(&selector.as_str()) {
        panic!("unrecognized pattern in first argument {}", &args[1]);
    }

    // read inputs file
    let open_in_file = File::open(&args[2]).expect("could not open input file");
    let lines = io::BufReader::new(open_in_file).lines();

    // read in trained vecs and tokens
    let w = match files_handling::read_input::<Array2<f32>>(&args[3]) {
        Ok(w) => w,
        Err(e) => panic!("{}", e),
    };
    let t2i = match files_handling::read_input::<HashMap<String, usize>>(&args[4]) {
        Ok(t2i) => t2i,
        Err(e) => panic!("{}", e),
    };
    let sim_obj = Similarity::new(w, t2i);

    let inputs = lines
        .map(|line| {
            line.expect("could not read line")
                .split(' ')
                .map(|x| x.to_string())
                .collect::<Vec<String>>()
        })
        .collect::<Vec<Vec<String>>>();

    let outcome = match selector.as_str() {
        // the analogies task expects a file in which each line holds a
        // quartet separated by spaces, for example:
        // king queen man woman
        "a" => run_analogies(&inputs, 10, &sim_obj),
        // the word similarity task expects one token per line
        "b" => run_similarity(&inputs, 10, &sim_obj),
        // the odd-one-out task expects at least two tokens per line
        "c" => run_doesnt_match(&inputs, &sim_obj),
        _ => panic!("unrecognized pattern in first argument {}", &args[1]),
    };

    if let Err(e) = outcome {
        panic!("{}", e);
    }
}

fn run_analogies(inputs: &[Vec<String>], k: usize, sim_obj: &Similarity) -> Result<()> {
    // each line gives 4 tokens, the object is to find the analogy of the
    // combination of the first 3, in hope that it would match the 4th.
    // i.e
    // a is to b as like c is to ?
    // translates to b - a + c : ?
    // i.e : high is to higher as like good is to : better

    for input in inputs {
        assert_eq!(input.len(), 4);

        let source = [input[0].as_str(), input[1].as_str(), input[2].as_str()];
        let target = input[3].as_str();

        let analogies = sim_obj.extract_analogies(source, k)?;
        let mut found_target = false;
        for (i, (analogy, score)) in analogies.iter().enumerate() {
            println!(
                "{} : {} - {} + {} ? {} = {}",
                i, source[1], source[0], source[2], analogy, score
            );
            if analogy == target {
                found_target = true;
                println!("found target '{}' analogy in place {}", target, 1 + i);
            }
        }

        if !found_target {
            println!(
                "target '{}' was not found within the first {} analogies",
                target, k
            );
        }

        println!("\n");
    }
    Ok(())
}

fn run_similarity(inputs: &[Vec<String>], k: usize, sim_obj: &Similarity) -> Result<()> {
    // finding the k most similar words to each of the input tokens

    for input in inputs {
        let token = &input[0];
        println!("searching {} most similar words to {}", k, token);
        let similarities = sim_obj.most_similar(token, k)?;
        for (i, (similar_token, score)) in similarities.iter().enumerate() {
            println!("{} : {} ? {} = {}", i, token, similar_token, score);
        }
        println!("\n");
    }

    Ok(())
}

fn run_doesnt_match(inputs: &[Vec<String>], sim_obj: &Similarity) -> Result<()> {
    // finding the token farthest from the centroid of each input group

    for input in inputs {
        let tokens: Vec<&str> = input.iter().map(|x| x.as_str()).collect();
        let outlier = sim_obj.doesnt_match(&tokens)?;
        println!("{} ? {}", input.join(" "), outlier);
    }

    Ok(())
}
